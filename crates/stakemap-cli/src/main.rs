use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use stakemap::export::{
    CancelToken, ExportController, ExportError, ExportOptions, HeadlessSurface, PageSetup,
    export_file_name,
};
use stakemap::render::raster::{RasterError, RasterOptions};
use stakemap::render::{HeadlessRenderer, LayoutConfig, LayoutEngine};
use stakemap::{ClassifiedEntity, OwnershipTree, RepresentativeOrder, TreeState, classify_tree};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Model(stakemap::Error),
    Render(stakemap_render::Error),
    Raster(RasterError),
    Export(ExportError),
    Json(serde_json::Error),
    NoData(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Model(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Export(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::NoData(reason) => write!(f, "No ownership data: {reason}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<stakemap::Error> for CliError {
    fn from(value: stakemap::Error) -> Self {
        match value {
            stakemap::Error::DataUnavailable { reason } => Self::NoData(reason),
            other => Self::Model(other),
        }
    }
}

impl From<stakemap_render::Error> for CliError {
    fn from(value: stakemap_render::Error) -> Self {
        match value {
            stakemap_render::Error::Core(err) => err.into(),
            other => Self::Render(other),
        }
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<ExportError> for CliError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Classify,
    Layout,
    Render,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
    /// Paginated raster PDF produced by the export controller.
    Pdf,
    /// Single-page vector PDF.
    VectorPdf,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "vector-pdf" => Ok(Self::VectorPdf),
            _ => Err(()),
        }
    }
}

/// `--config` file shape. Both sections are merged over the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CliConfig {
    layout: LayoutConfig,
    export: ExportOptions,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    config: Option<String>,
    render_format: RenderFormat,
    scale: Option<f64>,
    page: Option<PageSetup>,
    margin_mm: Option<f64>,
    representatives: Option<RepresentativeOrder>,
    background: Option<String>,
    out: Option<String>,
}

fn usage() -> &'static str {
    "stakemap-cli\n\
\n\
USAGE:\n\
  stakemap-cli [classify] [--pretty] [--representatives input|name] [--config <path>] [<path>|-]\n\
  stakemap-cli layout [--pretty] [--representatives input|name] [--config <path>] [<path>|-]\n\
  stakemap-cli render [--format svg|png|pdf|vector-pdf] [--scale <n>] [--page a4|letter] [--margin <mm>] [--background <css-color>] [--representatives input|name] [--config <path>] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Input is an ownership tree as JSON: either {\"root\": {...}} or a bare root node.\n\
  - --config takes a JSON file shaped like {\"layout\": {...}, \"export\": {...}}.\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - PNG and vector PDF output default to writing next to the input file (or ./out.<ext> for stdin).\n\
  - PDF output is paginated (A4 unless --page says otherwise) and defaults to\n\
    <root name>_ownership_structure.pdf next to the input file.\n\
  - Set STAKEMAP_LOG (e.g. STAKEMAP_LOG=debug) to see diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "classify" => args.command = Command::Classify,
            "layout" => args.command = Command::Layout,
            "render" => args.command = Command::Render,
            "--pretty" => args.pretty = true,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => {
                let Some(scale) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let scale = scale.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.scale = Some(scale);
            }
            "--page" => {
                let Some(page) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.page = Some(match page.trim().to_ascii_lowercase().as_str() {
                    "a4" => PageSetup::a4(),
                    "letter" => PageSetup::letter(),
                    _ => return Err(CliError::Usage(usage())),
                });
            }
            "--margin" => {
                let Some(margin) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let margin = margin.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(margin.is_finite() && margin >= 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.margin_mm = Some(margin);
            }
            "--representatives" => {
                let Some(order) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.representatives = Some(match order.as_str() {
                    "input" => RepresentativeOrder::Input,
                    "name" => RepresentativeOrder::Name,
                    _ => return Err(CliError::Usage(usage())),
                });
            }
            "--background" => {
                let Some(bg) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("STAKEMAP_LOG")
        .unwrap_or_else(|_| "warn".into());
    // A second init (e.g. under a test harness) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

/// Empty input and a JSON `null` mean the data source had nothing to give.
fn tree_state(text: &str) -> Result<TreeState, CliError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(TreeState::unavailable("input is empty"));
    }
    Ok(TreeState::Loaded(OwnershipTree::from_json_str(trimmed)?))
}

fn load_config(args: &Args) -> Result<CliConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => serde_json::from_str::<CliConfig>(&std::fs::read_to_string(path)?)?,
        None => CliConfig::default(),
    };
    if let Some(order) = args.representatives {
        config.layout.representative_order = order;
    }
    if let Some(scale) = args.scale {
        config.export.oversampling = scale;
    }
    if let Some(page) = args.page {
        config.export.page = page;
    }
    if let Some(margin) = args.margin_mm {
        config.export.page.margin_mm = margin;
    }
    Ok(config)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn default_out_path(input: Option<&str>, ext: &str) -> PathBuf {
    match input {
        Some(path) if path != "-" => PathBuf::from(path).with_extension(ext),
        _ => PathBuf::from(format!("out.{ext}")),
    }
}

/// Next to the input file (or in the working directory for stdin), named after the root.
fn default_export_path(input: Option<&str>, title: &str) -> PathBuf {
    let name = export_file_name(title, "pdf");
    match input {
        Some(path) if path != "-" => Path::new(path)
            .parent()
            .map(|dir| dir.join(&name))
            .unwrap_or_else(|| PathBuf::from(&name)),
        _ => PathBuf::from(name),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityOut<'a> {
    id: &'a str,
    display_name: &'a str,
    priority: u8,
    total_shares: i64,
}

impl<'a> From<&'a ClassifiedEntity> for EntityOut<'a> {
    fn from(e: &'a ClassifiedEntity) -> Self {
        Self {
            id: &e.node.id,
            display_name: &e.node.display_name,
            priority: e.priority,
            total_shares: e.total_shares(),
        }
    }
}

#[derive(Serialize)]
struct ClassifyOut<'a> {
    root: &'a str,
    shareholders: Vec<EntityOut<'a>>,
    representatives: Vec<EntityOut<'a>>,
    excluded: Vec<EntityOut<'a>>,
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let text = read_input(args.input.as_deref())?;
    let state = tree_state(&text)?;
    let Some(tree) = state.tree()? else {
        return Err(CliError::NoData("tree is still loading".to_string()));
    };

    let engine = LayoutEngine::new(config.layout.clone());

    match args.command {
        Command::Classify => {
            let classified = classify_tree(tree, config.layout.representative_order);
            let out = ClassifyOut {
                root: &tree.root.id,
                shareholders: classified.shareholders.iter().map(EntityOut::from).collect(),
                representatives: classified
                    .representatives
                    .iter()
                    .map(EntityOut::from)
                    .collect(),
                excluded: classified.excluded.iter().map(EntityOut::from).collect(),
            };
            write_json(&out, args.pretty)
        }
        Command::Layout => {
            let Some(layout) = stakemap_render::layout_state(&engine, &state)? else {
                return Err(CliError::NoData("tree is still loading".to_string()));
            };
            write_json(&layout, args.pretty)
        }
        Command::Render => {
            let mut renderer = HeadlessRenderer {
                engine,
                ..HeadlessRenderer::default()
            };
            if let Some(bg) = &args.background {
                renderer.options.svg.background = Some(bg.clone());
            }

            match args.render_format {
                RenderFormat::Svg => {
                    let svg = renderer.render_svg_with_root_id(tree);
                    write_text(&svg, args.out.as_deref())
                }
                RenderFormat::Png => {
                    let raster = RasterOptions {
                        scale: args.scale.unwrap_or(1.0) as f32,
                        background: Some(
                            args.background.clone().unwrap_or_else(|| "white".to_string()),
                        ),
                    };
                    let bytes = renderer.render_png(tree, &raster)?;
                    let out = args
                        .out
                        .as_deref()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| default_out_path(args.input.as_deref(), "png"));
                    std::fs::write(out, bytes)?;
                    Ok(())
                }
                RenderFormat::VectorPdf => {
                    let bytes = renderer.render_vector_pdf(tree)?;
                    let out = args
                        .out
                        .as_deref()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| default_out_path(args.input.as_deref(), "pdf"));
                    std::fs::write(out, bytes)?;
                    Ok(())
                }
                RenderFormat::Pdf => {
                    let layout = renderer.layout(tree);
                    let surface = HeadlessSurface::new(
                        layout,
                        renderer.options.text_measurer.as_ref(),
                        renderer.options.svg.clone(),
                    );
                    let controller = ExportController::new(surface, config.export.clone());
                    let title = tree.root.display_name.as_str();
                    let Some(doc) = block_on(controller.export(title, &CancelToken::new()))?
                    else {
                        return Err(CliError::NoData("nothing to export".to_string()));
                    };
                    let bytes = doc.to_pdf_bytes()?;
                    let out = args
                        .out
                        .as_deref()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| default_export_path(args.input.as_deref(), title));
                    tracing::info!(path = %out.display(), pages = doc.page_count(), "wrote pdf");
                    std::fs::write(out, bytes)?;
                    Ok(())
                }
            }
        }
    }
}

fn main() {
    init_logging();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::NoData(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("stakemap-cli")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_render_flags() {
        let args = parse_args(&argv(&[
            "render",
            "--format",
            "pdf",
            "--page",
            "letter",
            "--margin",
            "5",
            "--representatives",
            "name",
            "tree.json",
        ]))
        .unwrap();
        assert!(matches!(args.command, Command::Render));
        assert_eq!(args.render_format, RenderFormat::Pdf);
        assert_eq!(args.page, Some(PageSetup::letter()));
        assert_eq!(args.margin_mm, Some(5.0));
        assert_eq!(args.representatives, Some(RepresentativeOrder::Name));
        assert_eq!(args.input.as_deref(), Some("tree.json"));
    }

    #[test]
    fn rejects_unknown_flags_and_bad_values() {
        assert!(matches!(
            parse_args(&argv(&["--nope"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&argv(&["render", "--format", "gif"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&argv(&["render", "--scale", "0"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&argv(&["a.json", "b.json"])),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn flags_override_config_sections() {
        let args = Args {
            scale: Some(3.0),
            margin_mm: Some(0.0),
            representatives: Some(RepresentativeOrder::Name),
            ..Args::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.export.oversampling, 3.0);
        assert_eq!(config.export.page.margin_mm, 0.0);
        assert_eq!(config.export.page.width_mm, 210.0);
        assert_eq!(config.layout.representative_order, RepresentativeOrder::Name);
    }

    #[test]
    fn empty_input_is_no_data() {
        let state = tree_state("  \n").unwrap();
        assert!(matches!(
            state.tree().map_err(CliError::from),
            Err(CliError::NoData(_))
        ));
        assert!(matches!(tree_state("null").unwrap(), TreeState::Unavailable { .. }));
    }

    #[test]
    fn export_path_sits_next_to_the_input() {
        let p = default_export_path(Some("data/acme.json"), "Acme Ltd");
        assert_eq!(p, PathBuf::from("data/Acme_Ltd_ownership_structure.pdf"));
        let p = default_export_path(None, "Acme Ltd");
        assert_eq!(p, PathBuf::from("Acme_Ltd_ownership_structure.pdf"));
    }
}
