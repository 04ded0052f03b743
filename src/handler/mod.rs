pub mod race_snapshot;
