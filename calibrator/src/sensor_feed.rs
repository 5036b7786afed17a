use std::{io::ErrorKind, path::Path, sync::Arc, time::Duration};

use calibrator_common::{config::SensorConfig, SensorFeedError, SensorReading};

pub trait SensorSource: Send + Sync {
    fn read(&self) -> Result<SensorReading, SensorFeedError>;
}

impl<T: SensorSource + ?Sized> SensorSource for Arc<T> {
    fn read(&self) -> Result<SensorReading, SensorFeedError> {
        (**self).read()
    }
}

#[derive(Debug, Clone)]
pub struct FileSensorFeed {
    config: SensorConfig,
}

impl FileSensorFeed {
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }
}

impl SensorSource for FileSensorFeed {
    fn read(&self) -> Result<SensorReading, SensorFeedError> {
        let path = &self.config.path;
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(SensorFeedError::Missing { path: path.clone() })
            }
            Err(source) => {
                return Err(SensorFeedError::Read {
                    path: path.clone(),
                    source,
                })
            }
        };

        let reading = SensorReading::parse(&content)?;

        let limit_secs = self.config.stale_timeout_secs;
        if limit_secs > 0 {
            if let Some(age) = artifact_age(path) {
                if age > Duration::from_secs(limit_secs) {
                    return Err(SensorFeedError::Stale {
                        age_secs: age.as_secs(),
                        limit_secs,
                    });
                }
            }
        }

        reading.check_range(self.config.min_valid_c, self.config.max_valid_c)
    }
}

fn artifact_age(path: &Path) -> Option<Duration> {
    std::fs::metadata(path).ok()?.modified().ok()?.elapsed().ok()
}
