use anyhow::{Context, Result, bail};
use html_lattice_config::Config;
use html_lattice_engine::{Block, FileTemplates, Member, RenderArgs, Url};
use serde::Deserialize;
use std::path::PathBuf;
use std::{env, process};

/// A page described in TOML: an optional template name and a list of member
/// entries, each either literal markup or a URL, optionally placed at a path.
///
/// ```toml
/// template = "page"
///
/// [[blocks]]
/// path = "header/title"
/// text = "<h1>Welcome</h1>"
///
/// [[blocks]]
/// path = "nav/links"
/// url = "/docs?ref=home"
/// ```
#[derive(Debug, Deserialize)]
struct PageManifest {
    template: Option<String>,
    #[serde(default)]
    blocks: Vec<BlockEntry>,
}

#[derive(Debug, Deserialize)]
struct BlockEntry {
    path: Option<String>,
    text: Option<String>,
    url: Option<String>,
}

impl BlockEntry {
    fn member(&self) -> Result<Member> {
        match (&self.text, &self.url) {
            (Some(text), None) => Ok(Member::Text(text.clone())),
            (None, Some(url)) => Ok(Member::Url(Url::parse(url))),
            (Some(_), Some(_)) => bail!("block entry has both `text` and `url`"),
            (None, None) => bail!("block entry needs `text` or `url`"),
        }
    }
}

fn build_page(manifest: &PageManifest) -> Result<Block> {
    let mut page = Block::new();
    for (index, entry) in manifest.blocks.iter().enumerate() {
        let member = entry
            .member()
            .with_context(|| format!("blocks[{index}]"))?;
        match &entry.path {
            Some(path) => page
                .add_p(path, member)
                .with_context(|| format!("blocks[{index}] at `{path}`"))?,
            None => page.add(member),
        }
    }
    Ok(page)
}

fn render(manifest: &PageManifest, templates_dir: Option<&PathBuf>) -> Result<String> {
    let mut page = build_page(manifest)?;

    if let Some(name) = &manifest.template {
        let Some(dir) = templates_dir else {
            bail!(
                "manifest uses template `{name}` but no templates directory is \
                 configured (pass one as the second argument or set `templates_path` \
                 in the config file)"
            );
        };
        let source = FileTemplates::new(dir);
        page.load_template(name, &source)?;
    }

    Ok(page.html(&RenderArgs::default()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <page.toml> [templates-dir]", args[0]);
        eprintln!(
            "Or set `templates_path` in {}",
            Config::config_path().display()
        );
        process::exit(1);
    }

    let manifest_path = PathBuf::from(&args[1]);
    let templates_dir = if let Some(dir) = args.get(2) {
        Some(PathBuf::from(dir))
    } else {
        match Config::load() {
            Ok(config) => config.map(|c| c.templates_path),
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                process::exit(1);
            }
        }
    };

    let content = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    let manifest: PageManifest = toml::from_str(&content)
        .with_context(|| format!("parsing {}", manifest_path.display()))?;

    let html = render(&manifest, templates_dir.as_ref())?;
    println!("{html}");
    Ok(())
}
