use std::path::PathBuf;
use std::time::Duration;

use blackjack_table::{
    store, Action, Card, Deck, Notice, Phase, Round, Session, SessionConfig, SessionHandle,
    Snapshot, Totals,
};
use rand::Rng;
use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

#[derive(Debug, StructOpt)]
#[structopt(name = "blackjack", about = "Play blackjack against the dealer.")]
struct Opt {
    /// Pause between dealer draws, in milliseconds.
    #[structopt(long, default_value = "500")]
    dealer_delay_ms: u64,
    /// Keep cumulative totals in this JSON file instead of in memory.
    #[structopt(long, parse(from_os_str))]
    stats_file: Option<PathBuf>,
    /// Seed the shoe for a reproducible session.
    #[structopt(long)]
    seed: Option<u64>,
    /// Zero the saved totals before playing.
    #[structopt(long)]
    reset_stats: bool,
    /// Play this many rounds with random moves and report how they went.
    #[structopt(long)]
    simulate: Option<usize>,
    /// Print the table as JSON lines.
    #[structopt(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let opt = Opt::from_args();

    let store = store::open_or_memory(opt.stats_file.as_deref()).await;
    if opt.reset_stats {
        match store.reset().await {
            Ok(()) => info!("saved stats reset"),
            Err(err) => warn!(%err, "failed to reset saved stats"),
        }
    }
    let deck = match opt.seed {
        Some(seed) => {
            let mut deck = Deck::with_seed(seed);
            deck.shuffle();
            deck
        }
        None => Deck::new(),
    };
    let round = Round::new(deck, store)?;

    match opt.simulate {
        Some(rounds) => simulate(round, rounds).await,
        None => play(round, &opt).await,
    }
}

// Plays rounds back to back with random moves, without dealer pacing.
// Each round's stat write is drained before the next deal.
async fn simulate(mut round: Round, rounds: usize) -> eyre::Result<()> {
    println!("Running {} simulations", rounds);
    println!("========");
    for i in 0..rounds {
        if i > 0 {
            round.deal()?;
        }
        while round.phase() == Phase::PlayerTurn {
            match act() {
                Action::Hit => {
                    round.hit()?;
                }
                _ => {
                    round.stay()?;
                    round.play_dealer()?;
                }
            }
        }
        round.flush().await;
    }

    let stats = round.stats();
    let pct = |n: u64| 100.0 * (n as f64) / (stats.total().max(1) as f64);
    println!("Player won {:.1}% of rounds", pct(stats.wins));
    println!("Player lost {:.1}% of rounds", pct(stats.loses));
    println!("Player drew {:.1}% of rounds", pct(stats.draws));
    let totals = *round.store().subscribe().borrow();
    print_totals(&totals);
    Ok(())
}

fn act() -> Action {
    let mut gen = rand::thread_rng();
    match gen.gen_range(0..2) {
        0 => Action::Stay,
        _ => Action::Hit,
    }
}

async fn play(round: Round, opt: &Opt) -> eyre::Result<()> {
    let config = SessionConfig {
        dealer_delay: Duration::from_millis(opt.dealer_delay_ms),
        ..SessionConfig::default()
    };
    let (handle, session) = Session::spawn(round, config);
    let renderer = tokio::spawn(render(
        handle.snapshots(),
        handle.notices(),
        handle.totals(),
        opt.json,
    ));

    println!("Commands: [h]it, [s]tay, [d]eal, [r]eset saved stats, [n]ew session, [q]uit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let result = match line.trim() {
            "" => continue,
            "q" | "quit" => break,
            command => match run_command(&handle, command).await {
                Some(result) => result,
                None => {
                    println!("Unknown command {:?}", command);
                    continue;
                }
            },
        };
        if let Err(err) = result {
            warn!(%err, "action rejected");
            println!("Can't do that: {}", err);
        }
    }

    drop(handle);
    session.await?;
    renderer.abort();
    Ok(())
}

async fn run_command(handle: &SessionHandle, command: &str) -> Option<blackjack_table::Result<()>> {
    let result = match command {
        "h" | "hit" => handle.hit().await,
        "s" | "stay" => handle.stay().await,
        "d" | "deal" => handle.deal().await,
        "r" | "reset" => handle.reset_totals().await,
        "n" | "new" => handle.restart().await,
        _ => return None,
    };
    Some(result)
}

async fn render(
    mut snapshots: watch::Receiver<Snapshot>,
    mut notices: broadcast::Receiver<Notice>,
    mut totals: watch::Receiver<Totals>,
    json: bool,
) {
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let saved = *totals.borrow_and_update();
        if json {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{}", line),
                Err(err) => warn!(?err, "failed to encode snapshot"),
            }
        } else {
            print_table(&snapshot);
            print_totals(&saved);
        }
        tokio::select! {
            changed = snapshots.changed() => if changed.is_err() { break },
            changed = totals.changed() => if changed.is_err() { break },
            notice = notices.recv() => match notice {
                Ok(notice) => println!("*** {} ***", notice),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

fn print_table(snapshot: &Snapshot) {
    println!("========");
    println!("Dealer has: {} {}", snapshot.dealer_score, cards(&snapshot.dealer));
    println!("Player has: {} {}", snapshot.player_score, cards(&snapshot.player));
    println!("{} card(s) left, {}", snapshot.cards_remaining, snapshot.phase);
    println!(
        "Times won: {}  lost: {}  drawn: {}",
        snapshot.stats.wins, snapshot.stats.loses, snapshot.stats.draws
    );
}

fn print_totals(totals: &Totals) {
    println!(
        "Total times won: {}  lost: {}  drawn: {}",
        totals.total_wins, totals.total_loses, totals.total_draws
    );
}

fn cards(cards: &[Card]) -> String {
    cards
        .iter()
        .map(Card::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
