use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::{Identity, OwnerId, Piece, PieceId},
    protocol::Notice,
};
use submission::{CatalogBackend, ImageFile, SubmissionWorkflow, SubmitOutcome};

mod http_catalog;

use http_catalog::HttpCatalog;

#[derive(Parser, Debug)]
#[command(name = "earthen", about = "Browse and add pieces in an Earthen Hub catalog")]
struct Cli {
    #[arg(long, global = true, default_value = "http://127.0.0.1:8443")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Categories,
    List {
        #[arg(long)]
        owner: Option<String>,
    },
    Show {
        id: String,
        #[arg(long)]
        owner: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        materials: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        height: Option<String>,
        #[arg(long)]
        width: Option<String>,
        #[arg(long)]
        depth: Option<String>,
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        #[arg(long)]
        owner: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = HttpCatalog::new(cli.server_url);

    match cli.command {
        Command::Categories => {
            let categories = catalog.list_categories().await?;
            for category in categories {
                println!("{}\t{}", category.id, category.name);
            }
        }
        Command::List { owner } => {
            let owner = owner.map(OwnerId::new);
            let pieces = catalog.list_pieces(owner.as_ref()).await?;
            if pieces.is_empty() {
                println!("no pieces");
            }
            for piece in pieces {
                println!(
                    "{}\t{}\t{}\t{}",
                    piece.id,
                    piece.name,
                    piece.category.name,
                    piece.creation_date.format("%Y-%m-%d")
                );
            }
        }
        Command::Show { id, owner } => {
            let owner = owner.map(OwnerId::new);
            let piece = catalog
                .get_piece(&PieceId::new(id.clone()), owner.as_ref())
                .await?;
            match piece {
                Some(piece) => print_piece(&piece),
                None => bail!("piece '{id}' not found"),
            }
        }
        Command::Add {
            name,
            description,
            materials,
            category,
            height,
            width,
            depth,
            images,
            owner,
        } => {
            let identity = match owner {
                Some(owner) => Some(Identity::new(owner.clone(), owner)),
                None => catalog.session().await?,
            };
            let mut files = Vec::with_capacity(images.len());
            for path in &images {
                files.push(ImageFile::from_path(path).await?);
            }

            let mut workflow = SubmissionWorkflow::new(Arc::new(catalog), identity);
            if let Some(notice) = workflow.load_categories().await {
                print_notice(&notice);
            }
            workflow.edit(|form| {
                form.name = name;
                form.description = description;
                form.materials = materials;
                form.category_id = category;
                form.height = height.unwrap_or_default();
                form.width = width.unwrap_or_default();
                form.depth = depth.unwrap_or_default();
            });
            if let Some(report) = workflow.select_files(files).await {
                report.notices.iter().for_each(print_notice);
            }

            match workflow.submit().await {
                SubmitOutcome::Created { piece, notice, .. } => {
                    print_notice(&notice);
                    print_piece(&piece);
                }
                SubmitOutcome::Invalid(errors) => {
                    for (field, message) in errors.iter() {
                        eprintln!("{field}: {message}");
                    }
                    bail!("piece was not added");
                }
                SubmitOutcome::Failed(notice) => {
                    print_notice(&notice);
                    bail!("piece was not added");
                }
                SubmitOutcome::Ignored => bail!("submission was not attempted"),
            }
        }
    }

    Ok(())
}

fn print_notice(notice: &Notice) {
    eprintln!("[{}] {}", notice.title, notice.description);
}

fn print_piece(piece: &Piece) {
    println!("{} ({})", piece.name, piece.id);
    println!("  category:  {}", piece.category.name);
    println!("  materials: {}", piece.materials);
    println!("  added:     {}", piece.creation_date.to_rfc3339());
    if piece.has_dimensions() {
        let fmt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "  size (cm): {} x {} x {}",
            fmt(piece.height),
            fmt(piece.width),
            fmt(piece.depth)
        );
    }
    println!("  images:    {}", piece.image_urls.len());
    println!("  {}", piece.description);
}
