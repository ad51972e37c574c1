use anyhow::{Context, Result};
use resolver_engine::camera::{CameraAction, DVec2};
use resolver_engine::net::UdsDataAccessLayer;
use resolver_engine::store::{selectors, ResolverAction, ResolverRuntime};
use resolver_engine::util::clock::SystemClock;
use resolver_engine::util::config::{self, EngineConfig};
use std::ffi::OsString;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show {
        document_id: String,
        url_search: String,
    },
    WriteConfig,
}

fn parse_args() -> Result<Command> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = OsString>,
{
    let mut document_id = None;
    let mut url_search = String::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--url-search" {
            let Some(value) = args.next() else {
                anyhow::bail!("--url-search expects a query string");
            };
            url_search = value.to_string_lossy().into_owned();
        } else if arg == "--write-config" {
            return Ok(Command::WriteConfig);
        } else if arg.to_string_lossy().starts_with("--") {
            anyhow::bail!("unknown argument: {:?}", arg);
        } else if document_id.is_none() {
            document_id = Some(arg.to_string_lossy().into_owned());
        } else {
            anyhow::bail!("unexpected argument: {:?}", arg);
        }
    }

    let Some(document_id) = document_id else {
        anyhow::bail!("usage: resolver-engine <document-id> [--url-search <qs>] | --write-config");
    };
    Ok(Command::Show {
        document_id,
        url_search,
    })
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let command = parse_args()?;
    let cfg = config::load_or_default();
    init_tracing(&cfg.log_filter);

    match command {
        Command::WriteConfig => {
            config::save(&cfg).context("write engine config")?;
            println!("config written");
            Ok(())
        }
        Command::Show {
            document_id,
            url_search,
        } => show(&cfg, document_id, url_search).await,
    }
}

async fn show(cfg: &EngineConfig, document_id: String, url_search: String) -> Result<()> {
    let dal = UdsDataAccessLayer::new(cfg.agent_socket.clone(), cfg.index_patterns.clone())
        .with_page_size(cfg.related_events_page_size);
    tracing::info!(socket = %dal.sock_path(), document_id = %document_id, "loading resolver tree");

    let mut rt = ResolverRuntime::new(Arc::new(dal), Arc::new(SystemClock));
    rt.dispatch(
        CameraAction::UserSetRasterSize(DVec2::new(cfg.raster_width, cfg.raster_height)).into(),
    );
    let time = rt.now();
    rt.dispatch(ResolverAction::AppReceivedNewExternalProperties {
        database_document_id: Some(document_id.clone()),
        url_search,
        time,
    });
    rt.settle().await;

    let state = rt.state();
    if selectors::has_error(state) {
        anyhow::bail!("no resolver tree for document {document_id}");
    }

    let visible = rt.visible_entities();
    println!("nodes ({}):", visible.process_node_positions.len());
    for node in &visible.process_node_positions {
        let name = selectors::process_for_entity_id(state, &node.entity_id)
            .map(|e| e.descriptive_name().to_string())
            .unwrap_or_default();
        let marker = if selectors::is_process_terminated(state, &node.entity_id) {
            " (terminated)"
        } else {
            ""
        };
        println!(
            "  {:>9.1} {:>9.1}  {}  {name}{marker}",
            node.position.x, node.position.y, node.entity_id
        );
    }

    println!("edges ({}):", visible.connecting_edge_line_segments.len());
    for edge in &visible.connecting_edge_line_segments {
        match &edge.metadata.elapsed_time {
            Some(elapsed) => println!(
                "  {} -> {}  {} {}",
                edge.parent_entity_id,
                edge.child_entity_id,
                elapsed.duration,
                elapsed.unit.as_str()
            ),
            None => println!("  {} -> {}", edge.parent_entity_id, edge.child_entity_id),
        }
    }

    match selectors::panel_view_and_parameters(state) {
        Some(panel) => {
            println!("panel: {panel:?}");
            if let Some(id) = panel.panel_node_id() {
                for (category, events) in selectors::related_events_by_category(state, id) {
                    println!("  {category}: {}", events.len());
                }
                if selectors::has_more_related_events(state, id) {
                    println!("  (more related events available)");
                }
            }
        }
        None => println!("panel: not found"),
    }
    Ok(())
}
