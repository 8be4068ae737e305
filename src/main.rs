use anyhow::{Context, Result};
use annotation_finder::classfile::ClassMetadata;
use annotation_finder::cli::{Cli, Commands, OutputFormat};
use annotation_finder::config::resolve_search_path;
use annotation_finder::logging::init_logging;
use annotation_finder::{
    AnnotationFinder, AnnotationTag, ClassFileReader, ClassSet, PackageName, SearchPathLoader,
    build_scan_pattern,
};
use clap::Parser;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command.clone() {
        Commands::Pattern { package, recursive } => {
            let package = PackageName::new(&package)?;
            println!("{}", build_scan_pattern(package.as_str(), recursive));
        }
        Commands::Find {
            annotation,
            package,
            recursive,
            invisible,
            format,
            output,
        } => {
            let search_path = resolve_search_path(&cli)?;
            let mut finder = AnnotationFinder::new(search_path);
            if invisible {
                finder = finder.with_reader(ClassFileReader::including_invisible());
            }
            let start = Instant::now();
            let tag = AnnotationTag::new(annotation);
            let classes = finder
                .find_annotated_classes_in(&tag, package.as_str(), recursive)
                .with_context(|| format!("Failed to scan package {package} for @{tag}"))?;
            let result = FindResult::new(&tag, &package, recursive, classes, start);
            write_find_output(&result, format, output.as_deref())?;
        }
        Commands::Inspect { class_name } => {
            let loader = SearchPathLoader::new(resolve_search_path(&cli)?);
            let (metadata, root) = loader
                .find_class_metadata(&class_name)
                .with_context(|| format!("Failed to locate class {class_name}"))?;
            let output = InspectResult {
                root: root.path().to_string_lossy().to_string(),
                metadata,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct FoundClass {
    class_name: String,
    location: Option<String>,
}

#[derive(Debug, Serialize)]
struct FindResult {
    annotation: String,
    package: String,
    recursive: bool,
    duration_ms: u64,
    classes: Vec<FoundClass>,
}

impl FindResult {
    fn new(
        tag: &AnnotationTag,
        package: &str,
        recursive: bool,
        classes: ClassSet,
        start: Instant,
    ) -> Self {
        let mut classes: Vec<FoundClass> = classes
            .into_iter()
            .map(|c| FoundClass {
                class_name: c.name().to_string(),
                location: c.location().map(|p| p.to_string_lossy().to_string()),
            })
            .collect();
        classes.sort_by(|a, b| a.class_name.cmp(&b.class_name));

        Self {
            annotation: tag.canonical_name().to_string(),
            package: package.to_string(),
            recursive,
            duration_ms: start.elapsed().as_millis() as u64,
            classes,
        }
    }
}

#[derive(Debug, Serialize)]
struct InspectResult {
    root: String,
    #[serde(flatten)]
    metadata: ClassMetadata,
}

fn write_find_output(result: &FindResult, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => {
            let mut out = String::new();
            for c in &result.classes {
                out.push_str(&c.class_name);
                out.push('\n');
            }
            out
        }
    };

    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    } else {
        print!("{content}");
        if !content.is_empty() && !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
