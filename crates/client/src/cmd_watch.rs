//! `taskwire watch`: mount one view and print it as it changes.

use std::future::Future;
use std::io;

use console::style;
use taskwire::config::Settings;
use taskwire::notice::NoticeLevel;
use taskwire::rest::HttpCollaborator;
use taskwire::token::SessionToken;
use taskwire::transport::TungsteniteConnector;
use taskwire::{ConnectionState, RunExit, Screen, ViewSubscriber};
use tracing::warn;

pub async fn run(
    settings: &Settings,
    token: Option<SessionToken>,
    screen: Screen,
) -> anyhow::Result<()> {
    let rest = HttpCollaborator::new(settings.origin.clone(), token.clone())?;

    println!();
    println!(
        "  {} {:?} view on {}",
        style("Watching").bold(),
        screen,
        settings.origin.as_str()
    );
    if token.is_none() {
        println!(
            "  {}",
            style("No session token: showing REST data without live updates").yellow()
        );
    }
    println!();

    let mut view = ViewSubscriber::mount(
        screen,
        TungsteniteConnector,
        settings.origin.clone(),
        rest,
        token,
    )
    .await;

    let shutdown = until_signal(tokio::signal::ctrl_c());
    let exit = view.run(shutdown, |view| render(view)).await;
    view.unmount();

    match exit {
        RunExit::Shutdown => println!("  Stopped."),
        RunExit::ChannelClosed => match view.last_error() {
            Some(reason) => println!("  Live updates ended: {reason}"),
            None => println!("  Live updates ended."),
        },
    }
    println!();
    Ok(())
}

/// Resolves when `signal` fires. If the handler cannot be installed the
/// watch keeps running until the channel closes.
async fn until_signal<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(
            component = "watch",
            event = "watch.signal_unavailable",
            error = %e,
            "Cannot listen for Ctrl-C"
        );
        std::future::pending::<()>().await;
    }
}

fn render<C, R>(view: &ViewSubscriber<C, R>) {
    let state = view.state();
    let link = match view.connection_state() {
        ConnectionState::Open => style("live").green(),
        ConnectionState::Connecting => style("connecting").yellow(),
        ConnectionState::Idle | ConnectionState::Closed => style("offline").dim(),
    };

    println!("  [{}]", link);
    match view.screen() {
        Screen::Tasks => {
            for task in state.tasks.iter() {
                println!("    #{:<5} {:<12} {}", task.id, task.status, task.title);
            }
            println!("    {} tasks, {} projects", state.tasks.len(), state.projects.len());
        }
        Screen::Projects => {
            for project in state.projects.iter() {
                println!("    #{:<5} {:<12} {}", project.id, project.status, project.title);
            }
        }
        Screen::Dashboard => match &state.analytics {
            Some(analytics) => {
                println!("    projects: {}", analytics.projects);
                println!("    tasks:    {}", analytics.tasks);
            }
            None => println!("    no dashboard data"),
        },
    }

    for notice in view.notices() {
        match notice.level {
            NoticeLevel::Info => println!("  {} {}", style("•").cyan(), notice.text),
            NoticeLevel::Error => println!("  {} {}", style("!").red(), notice.text),
        }
    }
    println!();
}
