//! Loader double that records every call with timestamps and checks that no
//! link is ever loaded twice at the same time.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tfmod_core::{LoadError, ModuleContent, ModuleLoader};

#[derive(Debug, Clone)]
pub struct Call {
    pub target_dir: PathBuf,
    pub link: String,
    pub version: String,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Debug, Default)]
pub struct RecordingLoader {
    /// Time each call spends "fetching".
    pub delay: Duration,
    /// Links whose load returns an error.
    pub failing: HashSet<String>,
    /// Links whose load panics.
    pub panicking: HashSet<String>,
    calls: Mutex<Vec<Call>>,
    in_flight: Mutex<HashSet<String>>,
    max_in_flight: Mutex<usize>,
    overlaps: Mutex<Vec<String>>,
}

impl RecordingLoader {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Largest number of loads observed running at once.
    pub fn max_in_flight(&self) -> usize {
        *self.max_in_flight.lock().unwrap()
    }

    /// Links observed in flight twice at once.
    pub fn overlaps(&self) -> Vec<String> {
        self.overlaps.lock().unwrap().clone()
    }
}

impl ModuleLoader for RecordingLoader {
    fn load(&self, target_dir: &Path, link: &str, version: &str) -> Result<ModuleContent, LoadError> {
        let started = Instant::now();
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if !in_flight.insert(link.to_string()) {
                self.overlaps.lock().unwrap().push(link.to_string());
            }
            let mut max = self.max_in_flight.lock().unwrap();
            *max = (*max).max(in_flight.len());
        }
        std::thread::sleep(self.delay);
        self.in_flight.lock().unwrap().remove(link);
        self.calls.lock().unwrap().push(Call {
            target_dir: target_dir.to_path_buf(),
            link: link.to_string(),
            version: version.to_string(),
            started,
            finished: Instant::now(),
        });

        if self.panicking.contains(link) {
            panic!("loader panicked for {}", link);
        }
        if self.failing.contains(link) {
            return Err(LoadError::Http(500));
        }
        Ok(ModuleContent::at(target_dir.to_path_buf()))
    }
}
