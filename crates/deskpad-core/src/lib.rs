pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod ids;
pub mod list;
pub mod render;
pub mod stats;
pub mod store;
pub mod surface;
pub mod widgets;

use std::ffi::OsString;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use crate::clock::SystemClock;
use crate::dashboard::{Dashboard, Services};
use crate::events::EventBus;
use crate::render::{Renderer, StdinPrompt, TerminalNotifier, TerminalView};
use crate::store::Store;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting deskpad CLI");
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.deskrc.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );
    let settings = config::Settings::from_config(&cfg);

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    let store = Store::open(&data_dir)
        .with_context(|| format!("failed to open data store at {}", data_dir.display()))?;

    let renderer = Renderer::new(settings.color);
    let view = Rc::new(TerminalView::new(renderer.clone()));
    let services = Services {
        store,
        bus: EventBus::new(),
        view: view.clone(),
        notifier: Rc::new(TerminalNotifier::new(renderer.clone())),
        clock: Rc::new(SystemClock),
    };

    let inv = cli::Invocation::parse(&cfg, cli.rest)?;
    let dashboard = Dashboard::new(services, &settings);
    let mut session = commands::Session {
        dashboard,
        view,
        prompt: StdinPrompt::new(cli.yes || !settings.confirm),
        renderer,
        settings,
    };

    commands::dispatch(&mut session, inv)?;

    info!("done");
    Ok(())
}
