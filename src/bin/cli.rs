use anyhow::{anyhow, bail, Context};
use crabcapture::testing::{gradient_frame, SimulatedPlatform};
use crabcapture::{
    CameraSession, CaptureConfig, CaptureMode, PlatformEvent, SelectionField, SessionEvent,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crabcapture::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabcapture-cli <command> [args]");
        eprintln!("Commands: list-lenses, show-selection, record-demo, photo-demo, show-config");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "list-lenses" => cmd_list_lenses(&args).await,
        "show-selection" => cmd_show_selection(&args).await,
        "record-demo" => cmd_record_demo(&args).await,
        "photo-demo" => cmd_photo_demo(&args).await,
        "show-config" => cmd_show_config(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

struct Demo {
    platform: Arc<SimulatedPlatform>,
    session: CameraSession,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Demo {
    async fn open(config: CaptureConfig) -> anyhow::Result<Self> {
        let platform = Arc::new(SimulatedPlatform::with_default_lenses());
        let (tx, events) = mpsc::unbounded_channel();
        platform.attach_events(tx);
        let session = CameraSession::open(platform.clone(), config).await?;
        Ok(Self {
            platform,
            session,
            events,
        })
    }

    /// Apply every host event delivered so far.
    async fn pump(&mut self) -> anyhow::Result<()> {
        while let Ok(event) = self.events.try_recv() {
            self.session.handle_event(event).await?;
        }
        Ok(())
    }
}

fn load_config(args: &[String]) -> anyhow::Result<CaptureConfig> {
    match flag_value(args, "--config") {
        Some(path) => Ok(CaptureConfig::load_from_file(path)?),
        None => Ok(CaptureConfig::default()),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn flag_index(args: &[String], flag: &str) -> anyhow::Result<Option<usize>> {
    flag_value(args, flag)
        .map(|v| v.parse::<usize>().with_context(|| format!("{} expects an index", flag)))
        .transpose()
}

async fn cmd_list_lenses(args: &[String]) -> anyhow::Result<()> {
    let demo = Demo::open(load_config(args)?).await?;
    let catalog = demo.session.catalog();
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(catalog)?);
    } else {
        for (i, lens) in catalog.iter().enumerate() {
            let qualities: Vec<&str> = lens.supported_qualities.iter().map(|q| q.name()).collect();
            println!(
                "{}: {} lens ({}) qualities=[{}] flash={} zoom={}..{}",
                i,
                lens.direction(),
                lens.lens_selector.id,
                qualities.join(","),
                lens.has_flash_unit,
                lens.zoom_range.min_ratio,
                lens.zoom_range.max_ratio
            );
        }
    }
    Ok(())
}

async fn cmd_show_selection(args: &[String]) -> anyhow::Result<()> {
    let mut demo = Demo::open(load_config(args)?).await?;
    let session = &mut demo.session;

    if let Some(lens) = flag_index(args, "--lens")? {
        session.switch_lens(lens)?;
    }
    for (flag, field) in [
        ("--quality", SelectionField::Quality),
        ("--resolution", SelectionField::Resolution),
        ("--aspect", SelectionField::AspectRatio),
    ] {
        if let Some(index) = flag_index(args, flag)? {
            session.select(field, index)?;
        }
    }

    let view = session.view_state();
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&view)?);
    } else {
        println!(
            "lens={} quality={} resolution={} aspect_ratio={} bound={}",
            view.lens.map(|d| d.to_string()).unwrap_or_default(),
            view.quality_text,
            view.resolution_text,
            view.aspect_ratio_text,
            view.bound
        );
    }
    Ok(())
}

async fn cmd_record_demo(args: &[String]) -> anyhow::Result<()> {
    let seconds: u64 = flag_value(args, "--seconds")
        .map(|v| v.parse::<u64>())
        .transpose()
        .context("--seconds expects a number")?
        .unwrap_or(3);
    let json = args.contains(&"--json".to_string());

    let mut demo = Demo::open(load_config(args)?).await?;
    demo.session.set_mode(CaptureMode::Video)?;
    demo.session.start_recording()?;
    demo.pump().await?;
    report(&demo, json)?;

    for second in 1..=seconds {
        demo.platform
            .emit(PlatformEvent::Frame(gradient_frame(second * 30, 64, 48, 30)));
        demo.platform
            .emit_recording_progress(second * 512_000, Duration::from_secs(second));
        demo.pump().await?;
        tokio::task::yield_now().await;
        demo.session.poll_analysis();
        report(&demo, json)?;
        if second == seconds / 2 {
            demo.session.pause_recording()?;
            demo.pump().await?;
            report(&demo, json)?;
            demo.session.resume_recording()?;
            demo.pump().await?;
        }
    }

    demo.session.stop_recording()?;
    demo.pump().await?;
    report(&demo, json)?;
    demo.session.close();
    Ok(())
}

async fn cmd_photo_demo(args: &[String]) -> anyhow::Result<()> {
    let mut demo = Demo::open(load_config(args)?).await?;
    demo.session.set_mode(CaptureMode::Photo)?;
    let item = demo.session.take_photo()?;
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&item)?);
    } else {
        let (w, h) = item.thumbnail_size.unwrap_or((0, 0));
        println!("{} -> {} (thumbnail {}x{})", item.display_name, item.location, w, h);
    }
    demo.session.close();
    Ok(())
}

fn report(demo: &Demo, json: bool) -> anyhow::Result<()> {
    let view = demo.session.view_state();
    if json {
        println!("{}", serde_json::to_string(&view)?);
    } else {
        match view.luminosity {
            Some(luma) => println!("{} (luminosity {:.1})", view.status_text, luma),
            None => println!("{}", view.status_text),
        }
    }
    Ok(())
}

fn cmd_show_config(args: &[String]) -> anyhow::Result<()> {
    let config = match args.get(2).filter(|a| !a.starts_with("--")) {
        Some(path) => CaptureConfig::load_from_file(path)?,
        None => CaptureConfig::load_or_default(),
    };
    config.validate().map_err(|e| anyhow!(e))?;

    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let text = toml::to_string_pretty(&config)?;
        if text.is_empty() {
            bail!("configuration serialized to nothing");
        }
        print!("{}", text);
    }
    Ok(())
}
