mod config;

pub use self::config::{
    BackoffSettings, ServerSettings, Settings, SourceSettings, SweepSettings, TrackedToken,
};
