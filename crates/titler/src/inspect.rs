use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;
use titler_core::filename::stem;
use titler_core::{format_filename, normalize, NormalizationPlan, TitleExtraction};

use crate::pipeline::{self, TextSource};
use crate::prelude::{println, *};
use crate::translate::Translator;

#[derive(Debug, Clone, clap::Args)]
pub struct InspectOptions {
    /// Path to the PDF file
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Keep the title in its original language
    #[arg(long)]
    no_translate: bool,

    /// Do not OCR a page without a text layer
    #[arg(long)]
    no_ocr: bool,
}

#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub file: String,
    pub text_source: TextSource,
    pub language: Option<String>,
    pub result: TitleExtraction,
    pub proposed_name: Option<String>,
}

pub async fn run(options: InspectOptions, global: crate::Global) -> Result<()> {
    let config = crate::settings::from_global(&global)?;
    let bytes = std::fs::read(&options.path)
        .wrap_err_with(|| format!("Failed to read {}", options.path.display()))?;

    let ocr = (!options.no_ocr).then(|| crate::ocr::system_provider(&config));
    let analysis = tokio::task::spawn_blocking({
        let config = config.clone();
        move || pipeline::analyze(&bytes, &config, ocr.as_deref())
    })
    .await??;

    let translator = Translator::from_config(
        &config,
        global.translate_api_key.clone(),
        !options.no_translate,
    )?;

    let language = analysis.plan.as_ref().and_then(plan_language);
    let result = match (&analysis.plan, analysis.extraction.title()) {
        (Some(plan), Some(title)) => {
            let translation = translator.run(plan, title).await;
            normalize::apply(analysis.extraction.clone(), plan, translation)
        }
        _ => analysis.extraction.clone(),
    };

    let output = InspectOutput {
        file: options.path.display().to_string(),
        text_source: analysis.source,
        language,
        proposed_name: result
            .title()
            .map(format_filename)
            .filter(|name| !stem(name).is_empty()),
        result,
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_output(&output, global.verbose.then_some(analysis.page_text.as_str()));
    }

    Ok(())
}

fn plan_language(plan: &NormalizationPlan) -> Option<String> {
    match plan {
        NormalizationPlan::Keep { language } => Some(language.name().to_string()),
        NormalizationPlan::Translate { from, .. } => Some(from.name().to_string()),
        NormalizationPlan::DetectionFailed { .. } => None,
    }
}

fn print_output(output: &InspectOutput, page_text: Option<&str>) {
    println!("\n{}\n", output.file.bold().cyan());

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Title".bold().cyan(),
        output.result.title().unwrap_or("-").bright_white()
    ]);
    table.add_row(prettytable::row![
        "Proposed name".bold().cyan(),
        match &output.proposed_name {
            Some(name) => name.green(),
            None => "SKIPPED".yellow(),
        }
    ]);
    table.add_row(prettytable::row![
        "Method".bold().cyan(),
        output.result.method().as_str()
    ]);
    table.add_row(prettytable::row![
        "Score".bold().cyan(),
        format!("{:.2}", output.result.score())
    ]);
    table.add_row(prettytable::row![
        "Language".bold().cyan(),
        output.language.as_deref().unwrap_or("-")
    ]);
    table.add_row(prettytable::row![
        "Text source".bold().cyan(),
        format!("{:?}", output.text_source)
    ]);
    table.add_row(prettytable::row![
        "Explanation".bold().cyan(),
        output.result.explanation().bright_black()
    ]);
    table.printstd();

    if let Some(text) = page_text {
        println!("\n{}", "== First page text ==".bold().cyan());
        println!("{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use titler_core::normalize::Language;
    use titler_core::Method;

    #[test]
    fn test_plan_language() {
        let keep = NormalizationPlan::Keep {
            language: Language::new("en"),
        };
        let translate = NormalizationPlan::Translate {
            from: Language::new("he"),
            to: Language::new("en"),
        };
        let failed = NormalizationPlan::DetectionFailed {
            reason: "no letters".to_string(),
        };

        assert_eq!(plan_language(&keep).as_deref(), Some("English"));
        assert_eq!(plan_language(&translate).as_deref(), Some("Hebrew"));
        assert_eq!(plan_language(&failed), None);
    }

    #[test]
    fn test_json_shape() {
        let output = InspectOutput {
            file: "report.pdf".to_string(),
            text_source: TextSource::TextLayer,
            language: Some("English".to_string()),
            result: TitleExtraction::found(
                "Annual Report 2023 Summary",
                Method::FontAnalysis,
                0.9,
                "Found via font analysis (size: 18.0)",
            ),
            proposed_name: Some("annual_report_2023_summary.pdf".to_string()),
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["text_source"], "text_layer");
        assert_eq!(json["result"]["method"], "font_analysis");
        assert_eq!(json["result"]["title"], "Annual Report 2023 Summary");
        assert_eq!(json["proposed_name"], "annual_report_2023_summary.pdf");
    }
}
