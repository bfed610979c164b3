mod store;

pub use store::{load_path, JsonStore, PROJECT_DIR};
