//! HTML report: summary panel, results table and image galleries.
//!
//! The page is styled with Tailwind and DaisyUI from their CDNs. All record
//! data passes through the escaping [`Element`] builder.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error_message::parse_error_message;
use crate::report::markup::{Element, document};
use crate::report::summary::RunSummary;
use crate::runner::{ErrorCode, Outcome, ResultRecord, RunResults, RunTiming};
use crate::upload::MISMATCH_CODE;

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";
const DAISYUI_CDN: &str = "https://cdn.jsdelivr.net/npm/daisyui@4.12.14/dist/full.min.css";

/// Inputs of the HTML report besides the results themselves
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    pub title: String,
    /// Shown in the header; the only part of the page that is not derived from the run
    pub generated_at: DateTime<Local>,
    /// Footer label describing where the run happened
    pub environment: String,
    /// Prefix of image links, relative to the report file (e.g. `./unit_test_catEye`)
    pub image_base: String,
    /// Embedded thumbnails keyed by image file path; other images are linked
    pub thumbnails: HashMap<PathBuf, String>,
}

/// Render the full report document
pub fn render_html(results: &RunResults, timing: &RunTiming, options: &HtmlOptions) -> String {
    let summary = RunSummary::new(results, timing);

    let head = Element::new("head")
        .child(Element::void("meta").attr("charset", "UTF-8"))
        .child(
            Element::void("meta")
                .attr("name", "viewport")
                .attr("content", "width=device-width, initial-scale=1.0"),
        )
        .child(Element::new("title").text(options.title.as_str()))
        .child(Element::new("script").attr("src", TAILWIND_CDN))
        .child(
            Element::void("link")
                .attr("href", DAISYUI_CDN)
                .attr("rel", "stylesheet"),
        );

    let header = Element::new("header")
        .class("px-20 flex items-center justify-between p-4 bg-base-200 shadow-md")
        .child(Element::new("h1").class("text-2xl font-bold").text(options.title.as_str()))
        .child(
            Element::new("div")
                .class("text-xs text-gray-500")
                .text(format!("Generated on: {}", options.generated_at.format("%Y-%m-%d %H:%M:%S"))),
        );

    let container = Element::new("div")
        .class("container mx-auto p-6")
        .child(stats_section(&summary))
        .child(table_section(results, options))
        .child(gallery_section(
            "mb-10",
            "✅ Success Gallery",
            results.successes().iter().map(|r| gallery_card(r, options)),
        ))
        .child(gallery_section(
            "",
            "❌ Failure Gallery",
            results.failures().iter().map(|r| gallery_card(r, options)),
        ));

    let footer = Element::new("footer")
        .class("p-4 bg-base-200 text-center text-xs text-gray-500")
        .child(Element::new("b").text(format!("Test Environment: {}", options.environment)))
        .child(Element::new("p").text("Generated for internal testing purposes."));

    let body = Element::new("body")
        .class("bg-base-100 text-base-content")
        .child(header)
        .child(container)
        .child(footer);

    document(Element::new("html").attr("lang", "en").child(head).child(body))
}

/// Tooltip shown over a record's thumbnail.
///
/// Successes list every label as `label: NN.NN%`. A species mismatch shows the
/// probabilities parsed from the message; other failures show the message.
pub fn tooltip(record: &ResultRecord) -> String {
    match &record.outcome {
        Outcome::Success { response_data } => response_data
            .iter()
            .map(|c| format!("{}: {:.2}%", c.label, c.percent))
            .collect::<Vec<_>>()
            .join("\n"),
        Outcome::Failure {
            error_code: ErrorCode::Status(MISMATCH_CODE),
            error_message,
        } => {
            let parsed = parse_error_message(error_message);
            format!(
                "Classification mismatch\ndog_prob: {}\ncat_prob: {}",
                parsed.dog(),
                parsed.cat()
            )
        }
        Outcome::Failure { error_message, .. } if error_message.is_empty() => "Unknown Error".to_string(),
        Outcome::Failure { error_message, .. } => error_message.clone(),
    }
}

fn stats_section(summary: &RunSummary) -> Element {
    let stat = |title: &str, value: String, value_class: &str, desc: String| {
        Element::new("div")
            .class("stat")
            .child(Element::new("div").class("stat-title").text(title))
            .child(Element::new("div").class(value_class).text(value))
            .child(Element::new("div").class("stat-desc").text(desc))
    };

    Element::new("section")
        .class("my-6")
        .child(
            Element::new("div")
                .class("flex flex-row space-x-2 text-sm mb-3")
                .child(Element::new("div").class("font-medium").text("Test Duration:"))
                .child(Element::new("div").text(format!("({} seconds)", summary.elapsed_label()))),
        )
        .child(
            Element::new("div")
                .class("stats stats-horizontal shadow bg-base-100 w-full rounded-md")
                .child(stat(
                    "Total Tests",
                    summary.total.to_string(),
                    "stat-value",
                    "Completed in total".to_string(),
                ))
                .child(stat(
                    "Success",
                    summary.successes.to_string(),
                    "stat-value text-success",
                    format!("{} passed", summary.success_rate_percent()),
                ))
                .child(stat(
                    "Failures",
                    summary.failures.to_string(),
                    "stat-value text-error",
                    "Errors".to_string(),
                )),
        )
}

fn table_section(results: &RunResults, options: &HtmlOptions) -> Element {
    let head_row = Element::new("tr").children(
        ["#", "Image", "Name", "Extension", "Size", "Delay", "Status"]
            .into_iter()
            .map(|h| Element::new("th").text(h)),
    );

    let rows = results
        .iter()
        .enumerate()
        .map(|(index, record)| table_row(index + 1, record, options));

    Element::new("section")
        .class("mb-10")
        .child(Element::new("h2").class("text-lg font-medium mb-3").text("📋 Test Results"))
        .child(Element::new("p").class("text-sm text-gray-500 mb-3").text(
            "Below is a detailed summary of the test results, including individual performance metrics for each image.",
        ))
        .child(
            Element::new("div").class("overflow-x-auto rounded-md w-full").child(
                Element::new("table")
                    .class("table text-sm border border-neutral-200")
                    .child(Element::new("thead").class("bg-neutral-50").child(head_row))
                    .child(Element::new("tbody").children(rows)),
            ),
        )
}

fn table_row(position: usize, record: &ResultRecord, options: &HtmlOptions) -> Element {
    let (row_class, tone) = if record.is_success() {
        ("hover:bg-green-200 bg-green-100", "text-success")
    } else {
        ("hover:bg-red-200 bg-red-100", "text-error")
    };
    let status = match record.error_code() {
        None => "✅ 200".to_string(),
        Some(code) => format!("❌ {}", code),
    };

    let thumbnail = Element::new("div")
        .class("avatar tooltip tooltip-right")
        .attr("data-tip", tooltip(record))
        .child(
            Element::new("div").class("mask rounded-lg h-12 w-12").child(
                Element::void("img")
                    .attr("src", image_src(record, options))
                    .attr("alt", record.name_without_extension()),
            ),
        );

    Element::new("tr")
        .class(row_class)
        .child(Element::new("td").class("text-xs text-center text-neutral").text(position.to_string()))
        .child(Element::new("td").class("relative").child(thumbnail))
        .child(
            Element::new("td")
                .class("text-xs truncate font-medium")
                .text(record.name_without_extension()),
        )
        .child(Element::new("td").class("text-xs text-center").text(record.extension.as_str()))
        .child(
            Element::new("td")
                .class(format!("text-xs text-right {}", tone))
                .text(record.size.as_str()),
        )
        .child(
            Element::new("td")
                .class(format!("text-xs text-center {}", tone))
                .text(record.response_time.as_str()),
        )
        .child(
            Element::new("td")
                .class(format!("text-xs text-center {}", tone))
                .text(status),
        )
}

fn gallery_section(
    class: &str,
    heading: &str,
    cards: impl Iterator<Item = Element>,
) -> Element {
    Element::new("section")
        .class(class)
        .child(Element::new("h2").class("text-lg font-medium mb-5").text(heading))
        .child(Element::new("div").class("grid grid-cols-4 gap-4").children(cards))
}

fn gallery_card(record: &ResultRecord, options: &HtmlOptions) -> Element {
    let mut card = Element::new("div")
        .class("card shadow-md rounded-lg w-40 h-40 tooltip")
        .attr("data-tip", tooltip(record))
        .child(
            Element::new("figure").class("h-3/4 overflow-hidden").child(
                Element::void("img")
                    .attr("src", image_src(record, options))
                    .attr("alt", record.image_name.as_str())
                    .class("object-cover h-full w-full"),
            ),
        );

    if let Some(code) = record.error_code() {
        let badge = if code == ErrorCode::Status(MISMATCH_CODE) {
            "badge-warning"
        } else {
            "badge-error"
        };
        card = card.child(
            Element::new("div")
                .class(format!("absolute top-2 left-2 badge {} text-white text-xs", badge))
                .text(code.to_string()),
        );
    }

    card.child(
        Element::new("div")
            .class("card-body p-1 flex items-center justify-center")
            .child(
                Element::new("h2")
                    .class("text-center text-xs font-medium truncate")
                    .attr("title", record.image_name.as_str())
                    .text(record.image_name.as_str()),
            ),
    )
}

/// Embedded thumbnail if available, otherwise a link to the file
fn image_src(record: &ResultRecord, options: &HtmlOptions) -> String {
    match options.thumbnails.get(&record.file_path) {
        Some(uri) => uri.clone(),
        None if options.image_base.is_empty() => record.image_name.clone(),
        None => format!("{}/{}", options.image_base.trim_end_matches('/'), record.image_name),
    }
}
