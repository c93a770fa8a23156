use log::debug;

use crate::types::{FlailType, GradeLevel, MeasurementResult, ResultPath, UploadRecord};

/// Remote append-only collection of measurement results.
///
/// `append` must not block the caller; it reports whether the record was
/// accepted for delivery and logs its own failures.
pub trait ResultSink {
    fn append(&self, path: &ResultPath, record: &UploadRecord) -> bool;

    /// Upload both two-phase results; `true` only if both were accepted
    fn append_final(&self, grade_level: GradeLevel, infantry: &MeasurementResult, cavalry: &MeasurementResult) -> bool {
        let infantry_ok = self.append(&ResultPath::new(grade_level, FlailType::Infantry), &infantry.into());
        let cavalry_ok = self.append(&ResultPath::new(grade_level, FlailType::Cavalry), &cavalry.into());
        infantry_ok && cavalry_ok
    }
}

/// Sink used when uploads are disabled
#[derive(Debug, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn append(&self, path: &ResultPath, record: &UploadRecord) -> bool {
        debug!(
            "Upload disabled, dropping {} result ({:.3} J)",
            path.flail_type, record.max_energy
        );
        true
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Sink that keeps every append for inspection
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub appended: Rc<RefCell<Vec<(ResultPath, UploadRecord)>>>,
        pub fail: bool,
    }

    impl ResultSink for RecordingSink {
        fn append(&self, path: &ResultPath, record: &UploadRecord) -> bool {
            self.appended.borrow_mut().push((*path, *record));
            !self.fail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn final_upload_appends_both_presets() {
        let sink = RecordingSink::default();
        let infantry = MeasurementResult {
            max_energy: 5.0,
            ..Default::default()
        };
        let cavalry = MeasurementResult {
            max_energy: 3.0,
            ..Default::default()
        };

        assert!(sink.append_final(GradeLevel::Elementary, &infantry, &cavalry));
        let appended = sink.appended.borrow();
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0].0.flail_type, FlailType::Infantry);
        assert_eq!(appended[1].1.max_energy, 3.0);
    }

    #[test]
    fn final_upload_reports_failure() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let result = MeasurementResult::default();
        assert!(!sink.append_final(GradeLevel::Secondary, &result, &result));
    }
}
