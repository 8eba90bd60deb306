pub mod args;

pub use args::{Args, Command, CollectArgs, ProcessArgs};
