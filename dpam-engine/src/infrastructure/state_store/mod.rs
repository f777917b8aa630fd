mod file_state_store;

pub use file_state_store::FileStateStore;
