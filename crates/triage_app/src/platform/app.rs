use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::Context;
use triage_core::{update, AppState, Msg};
use triage_engine::EngineHandle;
use triage_logging::{triage_debug, triage_info};

use super::config::{AppConfig, DEFAULT_CONFIG_FILE};
use super::console::{self, Command, Input, HELP_TEXT};
use super::effects::EffectRunner;
use super::{logging, persistence, render};

pub fn run_app(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = AppConfig::load(&config_path)?.with_env_overrides();
    logging::initialize(config.log_destination);
    triage_info!("triage starting against {}", config.base_url);

    let (engine, events) = EngineHandle::new(config.backend_settings(), config.ingest_settings())
        .context("starting backend engine")?;
    let (input_tx, input_rx) = mpsc::channel::<Input>();
    let runner = EffectRunner::new(engine, events, config.state_dir.clone(), input_tx.clone());
    console::spawn_stdin_reader(input_tx);

    let mut session = Session {
        state: AppState::with_settings(config.core_settings()),
        runner,
    };

    println!("{HELP_TEXT}");
    let flags = persistence::load_client_flags(&config.state_dir);
    session.dispatch(Msg::RestoreClientFlags(flags));
    session.dispatch(Msg::LoadRequested);

    while let Ok(input) = input_rx.recv() {
        match input {
            Input::Msg(msg) => session.dispatch(msg),
            Input::Line(line) => {
                match console::parse(&line, &session.state.view(), Instant::now()) {
                    Command::Send(msg) => session.dispatch(msg),
                    Command::Reply(text) => println!("{text}"),
                    Command::Help => println!("{HELP_TEXT}"),
                    Command::Quit => break,
                }
            }
            Input::Closed => break,
        }
    }

    triage_info!("triage exiting");
    Ok(())
}

struct Session {
    state: AppState,
    runner: EffectRunner,
}

impl Session {
    fn dispatch(&mut self, msg: Msg) {
        triage_debug!("dispatch {msg:?}");
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        for line in self.runner.run(effects) {
            println!("{line}");
        }
        if self.state.consume_dirty() {
            println!("{}", render::render(&self.state.view()));
        }
    }
}
