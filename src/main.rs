use std::path::Path;
use std::time::{Duration, Instant};

mod audio;
mod calibrate;
mod config;
mod history;
mod pipeline;
mod remap;
mod render;
mod store;
mod types;
mod ui;

use audio::AudioGraph;
use config::TICK_INTERVAL_MS;
use pipeline::Pipeline;
use store::FsStore;
use types::not_ready;
use ui::{Command, TermSurface, draw_ui, handle_events, init_terminal, restore_terminal};

const DEMO_TRACK: &str = "assets/space-120280.wav";

fn main() -> Result<(), anyhow::Error> {
    let mut terminal = init_terminal()?;

    let cleanup = || {
        let _ = restore_terminal();
    };

    ctrlc::set_handler(move || {
        cleanup();
        std::process::exit(0);
    })
    .expect("Error setting Ctrl-C handler");

    let mut pipeline = Pipeline::new(FsStore::open()?);
    let mut surface = TermSurface::new();

    let mut graph = AudioGraph::microphone()?;
    let mut demo_playing = false;

    let mut raw = *not_ready();
    let tick_period = Duration::from_millis(TICK_INTERVAL_MS);

    loop {
        match handle_events()? {
            Some(Command::Quit) => break,
            Some(Command::Calibrate) => pipeline.begin_calibration(Instant::now(), &mut surface),
            Some(Command::Demo) => {
                // tear down the current graph before building the new one
                drop(graph);
                match AudioGraph::demo_track(Path::new(DEMO_TRACK)) {
                    Ok(demo) => {
                        graph = demo;
                        demo_playing = true;
                    }
                    Err(err) => {
                        eprintln!("failed to start demo track: {err:#}");
                        graph = AudioGraph::microphone()?;
                        demo_playing = false;
                    }
                }
            }
            None => {}
        }

        // demo track ran out: fall back to the microphone
        if demo_playing && graph.finished() {
            graph = AudioGraph::microphone()?;
            demo_playing = false;
        }

        graph.poll(&mut raw);
        pipeline.tick(Instant::now(), &raw, &mut surface);

        terminal.draw(|f| draw_ui(f, &surface, pipeline.is_calibrating()))?;

        std::thread::sleep(tick_period);
    }

    restore_terminal()?;
    Ok(())
}
