use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::ValueEnum;
use mermend_core::{FamilyHint, Finding, clean, extract, validate};
use mermend_llm::diagram::{DiagramRequest, DiagramResult, Escalation, generate_diagram};
use mermend_llm::LlmConfig;
use mermend_render::{RenderClient, RenderConfig, RenderFormat, to_jpeg};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageFormat {
    Png,
    Svg,
    /// Rendered as PNG, then re-encoded
    Jpeg,
}

impl ImageFormat {
    fn name(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Jpeg => "jpeg",
        }
    }
}

pub struct GenerateOptions {
    pub description: String,
    pub family: FamilyHint,
    pub start_date: Option<NaiveDate>,
    pub out: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub format: ImageFormat,
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read: {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write: {}", path.display()))
}

fn report(findings: &[Finding]) {
    for finding in findings {
        eprintln!("  {finding}");
    }
}

fn exit_status(findings: &[Finding]) -> ExitCode {
    if findings.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub fn check(input: &Path) -> Result<ExitCode> {
    let source = extract(&read_input(input)?);
    let findings = validate(&source);

    if findings.is_empty() {
        println!("OK: {} ({} lines), no issues found", source.family, source.len());
    } else {
        println!("{} issue(s) in {}:", findings.len(), source.family);
        for finding in &findings {
            println!("  {finding}");
        }
    }
    Ok(exit_status(&findings))
}

pub fn fix(input: &Path) -> Result<ExitCode> {
    let (repaired, findings) = clean(&read_input(input)?);

    println!("{}", repaired.after);
    for fix in &repaired.fixes {
        eprintln!("Line {}: {}", fix.line_number, fix.pass.describe());
    }
    if !findings.is_empty() {
        eprintln!("{} issue(s) remain after repair:", findings.len());
        report(&findings);
    }
    Ok(exit_status(&findings))
}

/// One-line status for a generation result, if there is anything to say.
pub fn escalation_note(result: &DiagramResult) -> Option<String> {
    match &result.escalation {
        Escalation::NotNeeded => None,
        Escalation::Applied if result.findings.is_empty() => {
            Some("Auto-corrected syntax errors.".to_string())
        }
        Escalation::Applied => Some(format!(
            "Auto-correction applied but {} issue(s) remain.",
            result.findings.len()
        )),
        Escalation::Failed(reason) => Some(format!("Auto-fix failed: {reason}")),
    }
}

pub async fn generate(
    options: GenerateOptions,
    llm_config: LlmConfig,
    render_config: RenderConfig,
) -> Result<ExitCode> {
    let mut request = DiagramRequest::new(options.description, options.family);
    if let Some(date) = options.start_date {
        request = request.with_start_date(date);
    }

    let result = generate_diagram(&request, llm_config)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if let Some(note) = escalation_note(&result) {
        eprintln!("{note}");
    }
    report(&result.findings);

    let text = result.source.text();
    match &options.out {
        Some(path) => {
            write_output(path, format!("{text}\n").as_bytes())?;
            info!("Wrote diagram source to {}", path.display());
        }
        None => println!("{text}"),
    }

    if let Some(image_path) = &options.image {
        let client = RenderClient::new(render_config);
        let bytes = render_image(&client, &text, options.format).await?;
        write_output(image_path, &bytes)?;
        info!("Wrote {} image to {}", options.format.name(), image_path.display());
    }

    Ok(exit_status(&result.findings))
}

pub async fn render(
    input: &Path,
    format: ImageFormat,
    out: &Path,
    render_config: RenderConfig,
) -> Result<ExitCode> {
    let source = extract(&read_input(input)?);
    if source.is_empty() {
        return Err(anyhow!("No diagram source found in {}", input.display()));
    }

    let client = RenderClient::new(render_config);
    let bytes = render_image(&client, &source.text(), format).await?;
    write_output(out, &bytes)?;
    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(ExitCode::SUCCESS)
}

async fn render_image(client: &RenderClient, source: &str, format: ImageFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        ImageFormat::Png => client.render(source, RenderFormat::Png).await?,
        ImageFormat::Svg => client.render(source, RenderFormat::Svg).await?,
        ImageFormat::Jpeg => to_jpeg(&client.render(source, RenderFormat::Png).await?)?,
    };
    Ok(bytes)
}
