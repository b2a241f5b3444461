use super::detach_keys::parse_detach_keys;
use crate::services::{SelectionFlags, StartOptions};
use clap::Args;

#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Container names or IDs
    pub containers: Vec<String>,

    /// Attach container's STDOUT and STDERR
    #[arg(short, long)]
    pub attach: bool,

    /// Override the key sequence for detaching a container. Format is a single
    /// character [a-Z] or ctrl-<value> where <value> is one of: a-z, @, ^, [, \, ] or _
    #[arg(long, value_parser = parse_detach_keys)]
    pub detach_keys: Option<String>,

    /// Keep STDIN open even if not attached
    #[arg(short, long)]
    pub interactive: bool,

    /// Proxy received signals to the process (default true if attaching, false otherwise)
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub sig_proxy: Option<bool>,

    /// Act on the latest container created
    #[arg(short, long)]
    pub latest: bool,
}

impl StartArgs {
    /// Splits the flags into the selection and start options.
    /// `default_detach_keys` applies when `--detach-keys` was not given.
    pub fn into_parts(self, default_detach_keys: Option<String>) -> (SelectionFlags, StartOptions) {
        let selection = SelectionFlags {
            ids: self.containers,
            all: false,
            latest: self.latest,
        };
        let options = StartOptions {
            attach: self.attach,
            interactive: self.interactive,
            detach_keys: self.detach_keys.or(default_detach_keys),
            sig_proxy: self.sig_proxy,
        };
        (selection, options)
    }
}
