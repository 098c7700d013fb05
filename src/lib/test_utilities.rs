use anyhow::Result;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

pub fn check_error<T>(result: Result<T>, pattern: &str) {
    match result {
        Ok(_) => panic!("Expected an error, but got Ok"),
        Err(err) => {
            assert!(
                err.to_string().contains(pattern),
                "Unexpected error {:?} containing pattern \"{:?}\" ",
                err,
                pattern
            );
        }
    }
}

/// An in-memory sink target whose contents can be read back while a
/// logger still holds a clone of it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        SharedBuffer::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
