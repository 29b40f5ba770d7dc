// Subject profile: loading the dataset file and compacting it for the prompt.

pub mod compact;
pub mod store;

pub use compact::compact_profile;
pub use store::ProfileStore;
