use folio::{
    cli::Cli,
    config::Config,
    content::{self, CoverArt, ItemRenderer},
    logging::{self, LogLevel},
    measure::{self, TextMeasurer},
    models::BookContent,
    paginate,
    ui::reader::Reader,
};

use clap::Parser;
use eyre::Result;
use std::collections::HashMap;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(LogLevel::from_verbosity(cli.verbose));

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load_from(path.clone()),
        None => Config::new(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Warning: Could not load configuration: {}", err);
            eprintln!("Starting with default settings");
            Config::load_from(std::path::PathBuf::from("configuration.json"))?
        }
    };

    let Some(content_path) = &cli.content else {
        eprintln!("No book content given. Pass the content JSON file as an argument.");
        return Ok(());
    };

    // A book that cannot be loaded leaves nothing to render.
    let book = match content::load_book_content(content_path) {
        Ok(book) => book,
        Err(err) => {
            logging::error(format!("Could not load book content: {err}"));
            eprintln!("Could not load book content: {err}");
            return Ok(());
        }
    };

    if cli.dump_pages {
        dump_pages(&book, content_path, cli.cols, cli.rows, &config)
    } else {
        let mut reader = Reader::new(config, book)?;
        reader.run()
    }
}

fn dump_pages(
    book: &BookContent,
    content_path: &Path,
    cols: u16,
    rows: u16,
    config: &Config,
) -> Result<()> {
    let measurer = TextMeasurer::for_viewport(cols);
    let max_height = measure::max_page_height_px(rows);
    let ratings = HashMap::new();
    let renderer = ItemRenderer::new(&ratings);
    let covers = CoverArt {
        front_src: config.settings.cover_image_url.clone(),
        inner_src: config.settings.cover_back_image_url.clone(),
    };

    let pagination = paginate::paginate(&book.chapters, max_height, &measurer, &renderer, &covers);

    println!(
        "{}: {} chapters, {} pages at {}x{}",
        content_path.display(),
        book.chapters.len(),
        pagination.raw_page_count(),
        cols,
        rows
    );
    for (id, start) in &pagination.chapter_starts {
        println!("  chapter {} starts at page {}", id, start);
    }
    for (index, page) in pagination.pages.iter().enumerate() {
        println!("--- page {} ({:?}) ---", index + 1, page.kind);
        let text = measure::markup_to_text(&page.html);
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    Ok(())
}
