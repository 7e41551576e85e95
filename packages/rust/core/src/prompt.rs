//! Prompt rendering for description generation.

use copydesk_shared::{CompanyRecord, fields};

use crate::employees::format_employee_count;

/// Render the copywriting instructions for one company.
///
/// Deterministic: the same record always yields the same prompt. The reply is
/// requested as a single JSON object with `meta_title`, `meta_description`
/// and `description_html`.
pub fn build_prompt(record: &CompanyRecord) -> String {
    let company_name = record.get(fields::LISTING_TITLE);
    let employee_count = format_employee_count(record.get(fields::EMPLOYEE_NUMBER));
    let website_url = record.get(fields::WEBSITE);
    let state = record.get(fields::STATE);
    let city = record.get(fields::CITY);
    let industry = record.get(fields::INDUSTRY);
    let founded_year = record.get(fields::FOUNDED);
    let summary = record.get(fields::SHORT_DESCRIPTION);

    let prompt = format!(
        r#"You are a marketing and SEO copywriter. Generate the following three things for the company described below:

1. A <strong>clean HTML-formatted description</strong> in 2–3 paragraphs followed by a bulleted "Key Highlights" section.
2. A concise and catchy <strong>meta title</strong> (max 60 characters).
3. A <strong>meta description</strong> (max 160 characters) that summarizes the company for search engines in a friendly but professional tone.

The HTML output should include:
- Two or three <p> paragraphs describing the company
- A <h3> titled "Company Highlights:"
- A <ul> list with:
    - Specialization
    - Key Offerings
    - Service Area
    - Recognition

The output should be returned <strong>as JSON</strong> in the following format:

{{
  "meta_title": "...",
  "meta_description": "...",
  "description_html": "..."
}}

Company Info:
- Name: {company_name}
- Employees: {employee_count}
- Website: {website_url}
- State: {state}
- City: {city}
- Industry: {industry}
- Founded: {founded_year}
- Summary: {summary}"#
    );

    prompt.trim().to_string()
}
