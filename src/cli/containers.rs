use crate::services::SelectionFlags;
use clap::{Args, Subcommand};

#[derive(Args, Debug, Clone, Default)]
pub struct StopArgs {
    /// Container names or IDs
    pub containers: Vec<String>,

    /// Stop all running containers
    #[arg(short, long)]
    pub all: bool,

    /// Act on the latest container created
    #[arg(short, long)]
    pub latest: bool,

    /// Seconds to wait before killing the container
    #[arg(short, long)]
    pub time: Option<u64>,
}

impl StopArgs {
    pub fn selection_flags(&self) -> SelectionFlags {
        SelectionFlags {
            ids: self.containers.clone(),
            all: self.all,
            latest: self.latest,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RmArgs {
    /// Container names or IDs
    pub containers: Vec<String>,

    /// Remove all containers
    #[arg(short, long)]
    pub all: bool,

    /// Act on the latest container created
    #[arg(short, long)]
    pub latest: bool,

    /// Stop running containers before removing them
    #[arg(short, long)]
    pub force: bool,
}

impl RmArgs {
    pub fn selection_flags(&self) -> SelectionFlags {
        SelectionFlags {
            ids: self.containers.clone(),
            all: self.all,
            latest: self.latest,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ContainerCommand {
    /// Remove all stopped containers
    Prune,
}
