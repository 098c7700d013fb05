pub mod lib {
    pub mod config;
    pub mod logger;
    pub mod test_utilities;
    pub mod utils;
}

pub mod logging_setup;
