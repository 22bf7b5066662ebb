//! Telemetry Recorder: serial torque polling
//!
//! Each sample is appended to `<directory>/<timestamp>.txt` as one JSON
//! array of six floats. When samples are kept in memory the series is
//! also handed to a [`TorquePlotter`] after the last poll.

use crate::{
    driver::Driver,
    logging::timestamp_stem,
    plot::{SvgPlotter, TorquePlotter},
    session::Session,
    types::TorqueSample,
    Result,
};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Files and samples produced by one recording run
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub sample_count: usize,
    pub record_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    /// Empty unless samples were kept in memory
    pub samples: Vec<TorqueSample>,
}

pub struct TorqueRecorder<P: TorquePlotter = SvgPlotter> {
    directory: PathBuf,
    plotter: P,
}

impl TorqueRecorder<SvgPlotter> {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_plotter(directory, SvgPlotter::default())
    }
}

impl<P: TorquePlotter> TorqueRecorder<P> {
    pub fn with_plotter(directory: impl Into<PathBuf>, plotter: P) -> Self {
        Self {
            directory: directory.into(),
            plotter,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create a fresh record file, suffixing the stem when a recording from
    /// the same second already exists. Existing records are never truncated.
    fn reserve_record(&self) -> Result<(String, PathBuf, File)> {
        let base = timestamp_stem();
        let mut suffix = 0;
        loop {
            let stem = if suffix == 0 {
                base.clone()
            } else {
                format!("{}_{}", base, suffix)
            };
            let path = self.directory.join(format!("{}.txt", stem));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((stem, path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Poll joint torque `count + 1` times, sleeping `interval` before each read.
    ///
    /// Sample indices run `1..=count + 1`; the loop stops once the index
    /// exceeds `count`, after that sample has been recorded. The record file
    /// is flushed and synced before returning, and also on error paths when
    /// the writer is dropped.
    pub async fn poll_and_record<D: Driver>(
        &self,
        session: &mut Session<D>,
        count: usize,
        interval: Duration,
        keep_in_memory: bool,
    ) -> Result<RecordingSummary> {
        session.require_ready("record joint torque")?;
        fs::create_dir_all(&self.directory)?;
        let (stem, record_path, file) = self.reserve_record()?;
        let mut writer = BufWriter::new(file);
        let mut samples = Vec::new();

        info!("Start reading torques into {}", record_path.display());
        let mut index = 0;
        loop {
            index += 1;
            tokio::time::sleep(interval).await;

            let torques = session.read_joint_torque()?;
            serde_json::to_writer(&mut writer, &torques.0)?;
            writer.write_all(b"\n")?;
            debug!("Torque sample {}: {}", index, torques);

            if keep_in_memory {
                samples.push(TorqueSample { index, torques });
            }
            if index > count {
                break;
            }
        }

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        info!("Torque data saved ({} samples)", index);

        let plot_path = if keep_in_memory {
            let path = self
                .directory
                .join(format!("{}.{}", stem, self.plotter.extension()));
            self.plotter.render(&samples, &path)?;
            Some(path)
        } else {
            None
        };

        Ok(RecordingSummary {
            sample_count: index,
            record_path,
            plot_path,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, SimDriver};
    use crate::types::{JointVector, RunMode};
    use crate::DoosanError;

    fn user_session(torques: &[f32]) -> Session<SimDriver> {
        let mut session = Session::new(
            SimDriver::new().with_torques(torques),
            "192.168.5.100",
            JointVector::zero(),
        );
        session.initialize().unwrap();
        session.home().unwrap();
        session.enter_mode(RunMode::User, None).unwrap();
        session
    }

    fn record_lines(path: &Path) -> Vec<Vec<f64>> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_records_count_plus_one_samples_without_plot() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TorqueRecorder::new(dir.path().join("record"));
        let mut session = user_session(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let summary = recorder
            .poll_and_record(&mut session, 3, Duration::ZERO, false)
            .await
            .unwrap();

        assert_eq!(summary.sample_count, 4);
        assert!(summary.plot_path.is_none());
        assert!(summary.samples.is_empty());

        let lines = record_lines(&summary.record_path);
        assert_eq!(lines.len(), 4);
        for line in lines {
            assert_eq!(line, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        }

        assert_eq!(session.driver().count(|c| matches!(c, DriverCall::ReadJointTorque)), 4);
        let entries: Vec<_> = fs::read_dir(recorder.directory()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_kept_samples_are_plotted() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TorqueRecorder::new(dir.path());
        let mut session = user_session(&[0.123, -4.567, 8.0, 0.0, 1.5, 2.25]);

        let summary = recorder
            .poll_and_record(&mut session, 1, Duration::from_millis(1), true)
            .await
            .unwrap();

        assert_eq!(summary.samples.len(), 2);
        assert_eq!(summary.samples[0].index, 1);
        assert_eq!(summary.samples[1].index, 2);
        assert_eq!(summary.samples[0].torques.0, [0.12, -4.57, 8.0, 0.0, 1.5, 2.25]);

        let plot = summary.plot_path.unwrap();
        assert_eq!(plot.extension().unwrap(), "svg");
        assert_eq!(plot.file_stem(), summary.record_path.file_stem());
        assert!(plot.exists());
    }

    #[tokio::test]
    async fn test_back_to_back_recordings_keep_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TorqueRecorder::new(dir.path());
        let mut session = user_session(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let first = recorder
            .poll_and_record(&mut session, 3, Duration::ZERO, true)
            .await
            .unwrap();
        let second = recorder
            .poll_and_record(&mut session, 0, Duration::ZERO, true)
            .await
            .unwrap();

        assert_ne!(first.record_path, second.record_path);
        assert_ne!(first.plot_path, second.plot_path);
        assert_eq!(record_lines(&first.record_path).len(), 4);
        assert_eq!(record_lines(&second.record_path).len(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[tokio::test]
    async fn test_requires_ready_session() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TorqueRecorder::new(dir.path().join("record"));
        let mut session = Session::new(SimDriver::new(), "192.168.5.100", JointVector::zero());
        session.initialize().unwrap();

        let err = recorder
            .poll_and_record(&mut session, 2, Duration::ZERO, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DoosanError::State { .. }));
        // Rejected before any file is created
        assert!(!recorder.directory().exists());
        assert_eq!(session.driver().count(|c| matches!(c, DriverCall::ReadJointTorque)), 0);
    }
}
