use markmaid::{
    DataView, Document, MarkmaidSettings, MatchNavigator, SanitizeRules, Viewer, Viewport,
    sanitize_html,
};
use serde::Serialize;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Markmaid(markmaid::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Markmaid(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<markmaid::Error> for CliError {
    fn from(value: markmaid::Error) -> Self {
        Self::Markmaid(value)
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
    Render,
    Diagrams,
    Sanitize,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    data_view: bool,
    settings: Option<String>,
    search: Option<String>,
    select: usize,
    viewer: bool,
    viewport_width: f64,
    viewport_height: f64,
    pretty: bool,
    out: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiagramOut<'a> {
    id: &'a str,
    raw: &'a str,
    source: &'a str,
}

fn usage() -> &'static str {
    "markmaid-cli\n\
\n\
USAGE:\n\
  markmaid-cli [render] [--data-view] [--settings <json-file>] [--search <query>] [--select <n>] [--viewer] [--viewport-width <w>] [--viewport-height <h>] [--out <path>] [<path>|-]\n\
  markmaid-cli diagrams [--data-view] [--settings <json-file>] [--pretty] [<path>|-]\n\
  markmaid-cli sanitize [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - --data-view reads the input as a host data-view JSON document instead of Markdown.\n\
  - render prints sanitized HTML; diagram blocks are left as <pre class=\"mermaid\"> for a\n\
    client-side engine.\n\
  - --search highlights every match; --select <n> makes match n current (default 1).\n\
  - --viewer wraps the document like the embedded viewer does (empty-content message,\n\
    viewport-sized scroll container, debug panel).\n\
  - diagrams prints the raw and normalized source of every diagram block as JSON.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        command: Command::Render,
        select: 1,
        viewport_width: 800.0,
        viewport_height: 600.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "diagrams" => args.command = Command::Diagrams,
            "sanitize" => args.command = Command::Sanitize,
            "--data-view" => args.data_view = true,
            "--viewer" => args.viewer = true,
            "--pretty" => args.pretty = true,
            "--settings" => args.settings = Some(next_value(&mut it)?.clone()),
            "--search" => args.search = Some(next_value(&mut it)?.clone()),
            "--select" => {
                args.select = next_value(&mut it)?
                    .parse::<usize>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if args.select == 0 {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--viewport-width" => {
                args.viewport_width = next_value(&mut it)?
                    .parse::<f64>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--viewport-height" => {
                args.viewport_height = next_value(&mut it)?
                    .parse::<f64>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
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

fn load_settings(path: Option<&str>) -> Result<MarkmaidSettings, CliError> {
    match path {
        None => Ok(MarkmaidSettings::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(MarkmaidSettings::from_json_str(&text).map_err(markmaid::Error::from)?)
        }
    }
}

fn load_data_view(text: &str, as_data_view: bool) -> Result<DataView, CliError> {
    if as_data_view {
        Ok(DataView::from_json_str(text).map_err(markmaid::Error::from)?)
    } else {
        Ok(DataView::single(text))
    }
}

fn render_document(args: &Args, data_view: &DataView, settings: &MarkmaidSettings) -> String {
    let content = markmaid::extract_content(Some(data_view));
    let mut doc = Document::parse(&content, &settings.mermaid);
    if let Some(query) = args.search.as_deref() {
        let mut nav = MatchNavigator::new();
        let count = nav.search(&mut doc, query);
        for _ in 1..args.select.min(count.max(1)) {
            nav.next(&mut doc);
        }
    }
    doc.to_html()
}

fn render_viewer(args: &Args, data_view: &DataView, settings: MarkmaidSettings) -> String {
    let mut viewer = Viewer::new(settings);
    viewer.set_viewport(Viewport::new(args.viewport_width, args.viewport_height));
    viewer.set_data_view(Some(data_view));
    if let Some(query) = args.search.as_deref() {
        viewer.open_search();
        let count = viewer.set_query(query);
        for _ in 1..args.select.min(count.max(1)) {
            viewer.search_next();
        }
    }
    viewer.render_html()
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;

    match args.command {
        Command::Sanitize => {
            let html = sanitize_html(&text, &SanitizeRules::default());
            write_text(&html, args.out.as_deref())
        }
        Command::Diagrams => {
            let settings = load_settings(args.settings.as_deref())?;
            let data_view = load_data_view(&text, args.data_view)?;
            let content = markmaid::extract_content(Some(&data_view));
            let doc = Document::parse(&content, &settings.mermaid);
            let out: Vec<DiagramOut<'_>> = doc
                .diagrams()
                .iter()
                .map(|b| DiagramOut {
                    id: b.view.id(),
                    raw: &b.raw,
                    source: &b.source,
                })
                .collect();
            let json = if args.pretty {
                serde_json::to_string_pretty(&out)?
            } else {
                serde_json::to_string(&out)?
            };
            write_text(&format!("{json}\n"), args.out.as_deref())
        }
        Command::Render => {
            let settings = load_settings(args.settings.as_deref())?;
            let data_view = load_data_view(&text, args.data_view)?;
            let html = if args.viewer {
                render_viewer(&args, &data_view, settings)
            } else {
                render_document(&args, &data_view, &settings)
            };
            write_text(&html, args.out.as_deref())
        }
    }
}

fn main() {
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

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
