/// Per-view settings the host hands the client: which job is open, its
/// source text, and where the listener left off.
#[derive(Debug, Clone, PartialEq)]
pub struct PageConfig {
    pub job_id: String,
    pub full_text: String,
    pub last_played_index: i64,
    pub mode: String,
}

pub const VIEW_MODE: &str = "view";

impl PageConfig {
    pub fn view(
        job_id: impl Into<String>,
        full_text: impl Into<String>,
        last_played_index: i64,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            full_text: full_text.into(),
            last_played_index,
            mode: VIEW_MODE.to_string(),
        }
    }

    /// The playback core only runs for `view` pages with a job and text.
    pub fn activates_playback(&self) -> bool {
        self.mode == VIEW_MODE && !self.job_id.is_empty() && !self.full_text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::PageConfig;

    #[test]
    fn only_view_mode_with_job_and_text_activates() {
        assert!(PageConfig::view("job", "Text.", -1).activates_playback());
        assert!(!PageConfig::view("", "Text.", -1).activates_playback());
        assert!(!PageConfig::view("job", "", -1).activates_playback());

        let mut page = PageConfig::view("job", "Text.", -1);
        page.mode = "new".into();
        assert!(!page.activates_playback());
    }
}
