//! Description generation pipeline.
//!
//! For every company in a directory, in order:
//!
//! 1. Render the prompt
//! 2. Ask the completion service for copy
//! 3. Pull the JSON object out of the reply (or fall back to the sentinel)
//! 4. Append an output row and rewrite the CSV
//!
//! A failure for one company never stops the run; only output I/O errors do.

use std::path::{Path, PathBuf};

use copydesk_shared::{
    AppConfig, CompanyDirectory, CompanyRecord, CopydeskError, GeneratedContent, OutputRow,
    Result, fields,
};
use tracing::{error, info, instrument, warn};

use crate::client::{ClientOptions, CompletionClient};
use crate::employees::format_employee_count;
use crate::output;
use crate::prompt::build_prompt;

/// How much of a bad completion is echoed into the logs.
const RAW_PREVIEW_CHARS: usize = 300;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Runtime generation settings, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Chat model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion service connection settings.
    pub client: ClientOptions,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for GeneratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.openai.model.clone(),
            temperature: config.openai.temperature,
            client: ClientOptions::from(&config.openai),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes and progress
// ---------------------------------------------------------------------------

/// How a single company's generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The reply contained a usable JSON object.
    Parsed,
    /// The call or the parse failed; sentinel content was used.
    Sentinel,
}

/// Totals for one [`DescriptionGenerator::generate_all_descriptions`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub output: PathBuf,
}

/// Progress callback for generation runs.
pub trait GenerationProgress: Send + Sync {
    /// Called before the completion request for a company.
    fn company_started(&self, name: &str, current: usize, total: usize);
    /// Called once the company's row has been persisted.
    fn company_finished(&self, name: &str, outcome: GenerationOutcome);
    /// Called after the final save of a pass.
    fn saved(&self, path: &Path, rows: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl GenerationProgress for SilentProgress {
    fn company_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn company_finished(&self, _name: &str, _outcome: GenerationOutcome) {}
    fn saved(&self, _path: &Path, _rows: usize) {}
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Generates marketing copy for each company and persists it as CSV.
#[derive(Debug)]
pub struct DescriptionGenerator {
    data_by_company: CompanyDirectory,
    client: CompletionClient,
    config: GeneratorConfig,
    results: Vec<OutputRow>,
}

impl DescriptionGenerator {
    /// The API key is passed in explicitly; nothing is read from the
    /// environment here.
    pub fn new(
        data_by_company: CompanyDirectory,
        api_key: impl Into<String>,
        config: GeneratorConfig,
    ) -> Result<Self> {
        let client = CompletionClient::new(api_key, &config.client)?;
        Ok(Self {
            data_by_company,
            client,
            config,
            results: Vec::new(),
        })
    }

    pub fn data_by_company(&self) -> &CompanyDirectory {
        &self.data_by_company
    }

    /// Rows produced by the most recent generation pass.
    pub fn results(&self) -> &[OutputRow] {
        &self.results
    }

    /// Generate copy for one company. Never fails: any error is logged and
    /// replaced with [`GeneratedContent::sentinel`].
    pub async fn generate_company_description(&self, record: &CompanyRecord) -> GeneratedContent {
        self.describe(record).await.0
    }

    async fn describe(&self, record: &CompanyRecord) -> (GeneratedContent, GenerationOutcome) {
        let prompt = build_prompt(record);
        let name = record.get(fields::LISTING_TITLE);

        let raw = match self
            .client
            .complete(&self.config.model, &prompt, self.config.temperature)
            .await
        {
            Ok(raw) => raw,
            Err(e) => return (fallback(name, &e, ""), GenerationOutcome::Sentinel),
        };

        match parse_completion(&raw) {
            Ok(content) => (content, GenerationOutcome::Parsed),
            Err(e) => (fallback(name, &e, &raw), GenerationOutcome::Sentinel),
        }
    }

    /// Generate copy for every company, in directory order.
    ///
    /// Each pass starts a fresh result list. After every company the full
    /// output file (header plus all rows so far) is rewritten, so a valid file
    /// exists even if the run is interrupted. Only write failures abort.
    #[instrument(skip_all, fields(companies = self.data_by_company.len(), output = %output.display()))]
    pub async fn generate_all_descriptions(
        &mut self,
        output: &Path,
        progress: &dyn GenerationProgress,
    ) -> Result<GenerationSummary> {
        self.results.clear();
        let total = self.data_by_company.len();
        let mut succeeded = 0;

        // An empty directory still gets a header-only file.
        if total == 0 {
            self.persist(output)?;
        }

        for (i, (company_name, record)) in self.data_by_company.iter().enumerate() {
            info!(company = %company_name, "generating description");
            progress.company_started(company_name, i + 1, total);

            let (content, outcome) = self.describe(record).await;
            if outcome == GenerationOutcome::Parsed {
                succeeded += 1;
            }

            let employee_count = format_employee_count(record.get(fields::EMPLOYEE_NUMBER));
            self.results
                .push(OutputRow::new(company_name, record, employee_count, content));
            output::write_results(output, &self.results).inspect_err(|e| {
                error!(error = %e, "error writing descriptions CSV");
            })?;

            progress.company_finished(company_name, outcome);
        }

        info!(path = %output.display(), rows = self.results.len(), "descriptions saved");
        progress.saved(output, self.results.len());

        Ok(GenerationSummary {
            processed: total,
            succeeded,
            failed: total - succeeded,
            output: output.to_path_buf(),
        })
    }

    /// Write the current results to `output`, independent of generation.
    pub fn save_results_to_csv(&self, output: &Path) -> Result<()> {
        self.persist(output)?;
        info!(path = %output.display(), rows = self.results.len(), "descriptions saved");
        Ok(())
    }

    fn persist(&self, output: &Path) -> Result<()> {
        output::write_results(output, &self.results).inspect_err(|e| {
            error!(error = %e, "error writing descriptions CSV");
        })
    }
}

// ---------------------------------------------------------------------------
// Response extraction
// ---------------------------------------------------------------------------

/// Pull the generated copy out of a raw completion.
///
/// Takes everything from the first `{` to the last `}` and parses it as a JSON
/// object with `meta_title`, `meta_description` and `description_html`. Prose
/// or code fences around the object are ignored. Braces in trailing prose
/// widen the span and make the parse fail.
pub fn parse_completion(raw: &str) -> Result<GeneratedContent> {
    let json = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => return Err(CopydeskError::parse("no JSON object in completion")),
    };

    serde_json::from_str(json)
        .map_err(|e| CopydeskError::parse(format!("invalid completion JSON: {e}")))
}

fn fallback(company: &str, error: &CopydeskError, raw: &str) -> GeneratedContent {
    let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
    warn!(company, %error, raw = %preview, "failed to parse response, using placeholder");
    GeneratedContent::sentinel()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use copydesk_shared::OUTPUT_HEADERS;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const FIXTURE: &str = "../../../fixtures/companies/directory.csv";

    // --- parse_completion ---------------------------------------------------

    #[test]
    fn parses_json_after_prose() {
        let raw = "Here you go:\n{\"meta_title\":\"A\",\"meta_description\":\"B\",\"description_html\":\"<p>C</p>\"}";
        let content = parse_completion(raw).expect("parse");
        assert_eq!(
            content,
            GeneratedContent {
                meta_title: "A".into(),
                meta_description: "B".into(),
                description_html: "<p>C</p>".into(),
            }
        );
    }

    #[test]
    fn parses_json_inside_code_fence() {
        let raw = "```json\n{\n  \"meta_title\": \"T\",\n  \"meta_description\": \"D\",\n  \"description_html\": \"<p>{x}</p>\"\n}\n```";
        let content = parse_completion(raw).expect("parse");
        assert_eq!(content.description_html, "<p>{x}</p>");
    }

    #[test]
    fn no_braces_is_parse_error() {
        let err = parse_completion("Sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, CopydeskError::Parse { .. }));
        assert!(parse_completion("} backwards {").is_err());
    }

    #[test]
    fn invalid_json_between_braces_is_parse_error() {
        assert!(parse_completion("{meta_title: A}").is_err());
    }

    #[test]
    fn missing_key_is_parse_error() {
        assert!(parse_completion(r#"{"meta_title":"A","meta_description":"B"}"#).is_err());
    }

    #[test]
    fn trailing_brace_in_prose_widens_span() {
        let raw = r#"{"meta_title":"A","meta_description":"B","description_html":"C"} note: {done}"#;
        assert!(parse_completion(raw).is_err());
    }

    // --- generation against a mock service ----------------------------------

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    fn copy_json(title: &str) -> String {
        serde_json::json!({
            "meta_title": title,
            "meta_description": format!("About {title}"),
            "description_html": format!("<p>{title}</p><h3>Company Highlights:</h3><ul><li>x</li></ul>"),
        })
        .to_string()
    }

    fn generator_for(server: &MockServer, directory: CompanyDirectory) -> DescriptionGenerator {
        let config = GeneratorConfig {
            client: ClientOptions {
                base_url: server.uri(),
                timeout: None,
            },
            ..GeneratorConfig::default()
        };
        DescriptionGenerator::new(directory, "sk-test", config).expect("generator")
    }

    fn directory(names: &[&str]) -> CompanyDirectory {
        names
            .iter()
            .map(|name| {
                let record: CompanyRecord = [
                    (fields::LISTING_TITLE, *name),
                    (fields::CITY, "Austin"),
                    (fields::EMPLOYEE_NUMBER, "1200"),
                ]
                .into_iter()
                .collect();
                (name.to_string(), record)
            })
            .collect()
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).expect("open output");
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, OUTPUT_HEADERS);
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl GenerationProgress for RecordingProgress {
        fn company_started(&self, name: &str, current: usize, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {name} {current}/{total}"));
        }
        fn company_finished(&self, name: &str, outcome: GenerationOutcome) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {name} {outcome:?}"));
        }
        fn saved(&self, _path: &Path, rows: usize) {
            self.events.lock().unwrap().push(format!("saved {rows}"));
        }
    }

    #[tokio::test]
    async fn generates_one_row_per_company_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Name: Globex"))
            .respond_with(completion(&format!("Sure!\n{}", copy_json("Globex"))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Name: Acme"))
            .respond_with(completion(&copy_json("Acme")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("company_descriptions.csv");
        let mut generator = generator_for(&server, directory(&["Globex", "Acme"]));
        let progress = RecordingProgress::default();

        let summary = generator
            .generate_all_descriptions(&out, &progress)
            .await
            .expect("generate");

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);

        let rows = read_rows(&out);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "Globex");
        assert_eq!(rows[1][0], "Acme");
        assert_eq!(rows[0][2], "Austin");
        assert_eq!(rows[0][3], "1,200 employees");
        assert_eq!(rows[0][7], "Globex");
        assert_eq!(rows[1][8], "About Acme");
        assert_eq!(generator.results().len(), 2);

        assert_eq!(
            *progress.events.lock().unwrap(),
            [
                "start Globex 1/2",
                "done Globex Parsed",
                "start Acme 2/2",
                "done Acme Parsed",
                "saved 2",
            ]
        );
    }

    #[tokio::test]
    async fn bad_reply_uses_sentinel_and_run_continues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Name: Broken"))
            .respond_with(completion("I could not produce JSON this time."))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("Name: Down"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream failure"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("Name: Fine"))
            .respond_with(completion(&copy_json("Fine")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let mut generator = generator_for(&server, directory(&["Broken", "Down", "Fine"]));

        let summary = generator
            .generate_all_descriptions(&out, &SilentProgress)
            .await
            .expect("generate");
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);

        let rows = read_rows(&out);
        assert_eq!(rows.len(), 3);
        for row in &rows[..2] {
            assert_eq!(row[7], "");
            assert_eq!(row[8], "");
            assert_eq!(row[9], "[Error parsing response]");
        }
        assert_eq!(rows[2][7], "Fine");
    }

    /// Reads the output file back every time a company finishes.
    struct SnapshotProgress {
        output: PathBuf,
        snapshots: Mutex<Vec<Vec<String>>>,
    }

    impl GenerationProgress for SnapshotProgress {
        fn company_started(&self, _name: &str, _current: usize, _total: usize) {}
        fn company_finished(&self, _name: &str, _outcome: GenerationOutcome) {
            let names = read_rows(&self.output)
                .into_iter()
                .map(|row| row[0].clone())
                .collect();
            self.snapshots.lock().unwrap().push(names);
        }
        fn saved(&self, _path: &Path, _rows: usize) {}
    }

    #[tokio::test]
    async fn file_is_complete_after_every_company() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Name: Beta"))
            .respond_with(completion("no json here"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(completion(&copy_json("Copy")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let mut generator = generator_for(&server, directory(&["Alpha", "Beta", "Gamma"]));
        let progress = SnapshotProgress {
            output: out.clone(),
            snapshots: Mutex::default(),
        };

        generator
            .generate_all_descriptions(&out, &progress)
            .await
            .expect("generate");

        assert_eq!(
            *progress.snapshots.lock().unwrap(),
            [
                vec!["Alpha"],
                vec!["Alpha", "Beta"],
                vec!["Alpha", "Beta", "Gamma"],
            ]
        );
    }

    #[tokio::test]
    async fn single_company_description_falls_back_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("{ not json }"))
            .mount(&server)
            .await;

        let generator = generator_for(&server, CompanyDirectory::new());
        let record: CompanyRecord = [(fields::LISTING_TITLE, "Acme")].into_iter().collect();
        let content = generator.generate_company_description(&record).await;
        assert!(content.is_sentinel());
    }

    #[tokio::test]
    async fn end_to_end_from_fixture() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(&copy_json("Copy")))
            .expect(4)
            .mount(&server)
            .await;

        let directory = copydesk_directory::load_companies(FIXTURE).expect("load fixture");
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let mut generator = generator_for(&server, directory);

        generator
            .generate_all_descriptions(&out, &SilentProgress)
            .await
            .expect("generate");

        let rows = read_rows(&out);
        let names: Vec<_> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(
            names,
            [
                "Vytalize Health",
                "Brightline Logistics",
                "Cedar & Pine Builders",
                "Northwind Analytics",
            ]
        );
        assert_eq!(rows[1][3], "1,200 employees");
        assert_eq!(rows[1][5], "brightline-logistics.com");
        assert_eq!(rows[3][3], "10,000+ employees");
    }

    #[tokio::test]
    async fn save_results_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(&copy_json("Same")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut generator = generator_for(&server, directory(&["A", "B"]));
        generator
            .generate_all_descriptions(&dir.path().join("run.csv"), &SilentProgress)
            .await
            .expect("generate");

        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        generator.save_results_to_csv(&first).expect("save first");
        generator.save_results_to_csv(&second).expect("save second");

        let a = std::fs::read(&first).unwrap();
        let b = std::fs::read(&second).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, std::fs::read(dir.path().join("run.csv")).unwrap());
    }

    #[tokio::test]
    async fn empty_directory_writes_header_only() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let mut generator = generator_for(&server, CompanyDirectory::new());

        let summary = generator
            .generate_all_descriptions(&out, &SilentProgress)
            .await
            .expect("generate");
        assert_eq!(summary.processed, 0);
        assert!(read_rows(&out).is_empty());
    }

    #[tokio::test]
    async fn unwritable_output_aborts_run() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(&copy_json("X")))
            .mount(&server)
            .await;

        let mut generator = generator_for(&server, directory(&["A"]));
        let err = generator
            .generate_all_descriptions(Path::new("/nonexistent/dir/out.csv"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, CopydeskError::Io { .. }));
    }

    #[test]
    fn config_from_app_config() {
        let config = GeneratorConfig::from(&AppConfig::default());
        assert_eq!(config.model, "gpt-4o");
        assert!((config.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.client.base_url, "https://api.openai.com/v1");
    }
}
