use crate::{ChannelStatus, Phase, RemoteId, SelectedFile};

/// Presentation descriptors. Rendering them is the platform's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    ShowIdle,
    ShowSelected { name: String, size: u64 },
    ShowUploading,
    ShowProgress { percent: u8 },
    ShowCompleted { result_url: String },
    ShowFailed { message: String },
}

/// Map a phase (plus the selected file, for `Selected`) to what should be
/// visible.
pub fn project(phase: &Phase, file: Option<&SelectedFile>) -> UiEffect {
    match phase {
        Phase::Idle => UiEffect::ShowIdle,
        Phase::Selected => match file {
            Some(file) => UiEffect::ShowSelected {
                name: file.name.clone(),
                size: file.size,
            },
            None => UiEffect::ShowIdle,
        },
        Phase::Uploading => UiEffect::ShowUploading,
        Phase::AwaitingProgress => UiEffect::ShowProgress { percent: 0 },
        Phase::Processing(percent) => UiEffect::ShowProgress { percent: *percent },
        Phase::Completed(url) => UiEffect::ShowCompleted {
            result_url: url.clone(),
        },
        Phase::Failed(reason) => UiEffect::ShowFailed {
            message: reason.clone(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Upload,
    Selected,
    Processing,
    Result,
    Error,
}

/// The visible screen. Descriptors overwrite fields rather than accumulate,
/// so applying one twice is the same as applying it once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScreenView {
    pub section: Section,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub percent: u8,
    pub result_url: Option<String>,
    pub error: Option<String>,
}

impl ScreenView {
    pub fn apply(&mut self, effect: &UiEffect) {
        match effect {
            UiEffect::ShowIdle => *self = ScreenView::default(),
            UiEffect::ShowSelected { name, size } => {
                self.section = Section::Selected;
                self.file_name = Some(name.clone());
                self.file_size = Some(format_file_size(*size));
                self.percent = 0;
                self.result_url = None;
                self.error = None;
            }
            UiEffect::ShowUploading => {
                self.section = Section::Processing;
                self.percent = 0;
            }
            UiEffect::ShowProgress { percent } => {
                self.section = Section::Processing;
                self.percent = (*percent).min(100);
            }
            UiEffect::ShowCompleted { result_url } => {
                self.section = Section::Result;
                self.percent = 100;
                self.result_url = Some(result_url.clone());
            }
            UiEffect::ShowFailed { message } => {
                self.section = Section::Error;
                self.error = Some(message.clone());
            }
        }
    }
}

/// Snapshot of the dispatcher state for status lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub channel: ChannelStatus,
    pub file_name: Option<String>,
    pub remote_id: Option<RemoteId>,
    pub dirty: bool,
}

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size in base 1024 with at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_trim_trailing_zeros() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5_242_880), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn sizes_beyond_gigabytes_stay_in_gigabytes() {
        assert_eq!(format_file_size(2 * 1024_u64.pow(4)), "2048 GB");
    }
}
