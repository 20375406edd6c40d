use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, bail};
use quorum_core::{CancelHandle, Fetcher, Scheduler, now};
use quorum_topics::*;
use web_time::Duration;

const DEFAULT_LATENCY_MS: u64 = 120;

fn latency_from_env() -> anyhow::Result<Duration> {
    match std::env::var("QUORUM_LATENCY_MS") {
        Ok(raw) => {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("QUORUM_LATENCY_MS must be a number of milliseconds, got '{raw}'"))?;
            Ok(Duration::from_millis(ms))
        }
        Err(_) => Ok(Duration::from_millis(DEFAULT_LATENCY_MS)),
    }
}

/// What the user is looking at.
#[derive(Clone, Default)]
struct Ui {
    paging: PageModel,
    sort: Vec<SortItem>,
    selected: Option<uuid::Uuid>,
}

struct Screens {
    list: Fetcher<Page<TopicWithOpenSession>>,
    results: Fetcher<Option<VoteResults>>,
}

fn app(s: &mut Scheduler, api: &TopicApi, ui: &Ui) -> Screens {
    Screens {
        list: topic_list(s, api, &ui.paging, &ui.sort),
        results: topic_results(s, api, ui.selected),
    }
}

/// Pumps until nothing is loading, sleeping until the next timer deadline.
fn settle(s: &mut Scheduler, api: &TopicApi, ui: &Ui) -> anyhow::Result<Screens> {
    loop {
        if s.pump() {
            let screens = s.compose(|s| app(s, api, ui));
            if !screens.list.loading() && !screens.results.loading() {
                return Ok(screens);
            }
        }
        match s.next_deadline() {
            Some(deadline) => std::thread::sleep(deadline.saturating_duration_since(now())),
            None => {
                let screens = s.compose(|s| app(s, api, ui));
                if screens.list.loading() || screens.results.loading() {
                    bail!("screens are loading but nothing is scheduled");
                }
                return Ok(screens);
            }
        }
    }
}

fn print(screens: &Screens) {
    println!("{}", describe_list(&screens.list.state()));
    println!("results: {}", describe_results(&screens.results.state()));
}

/// Runs a one-off API call to completion.
fn call(s: &mut Scheduler, fut: ApiFuture) -> anyhow::Result<serde_json::Value> {
    let out = Rc::new(RefCell::new(None));
    let slot = out.clone();
    s.spawner()
        .spawn(async move {
            *slot.borrow_mut() = Some(fut.await);
        })
        .context("scheduler is shut down")?;
    loop {
        s.pump();
        if let Some(result) = out.borrow_mut().take() {
            return Ok(result?);
        }
        match s.next_deadline() {
            Some(deadline) => std::thread::sleep(deadline.saturating_duration_since(now())),
            None => bail!("call stalled"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let latency = latency_from_env()?;
    let mut s = Scheduler::new();
    let desk = Rc::new(RefCell::new(TopicDesk::new()));
    let api = TopicApi::new(desk, s.spawner(), latency);

    for (title, description) in [
        ("Annual budget", "Approve the annual budget"),
        ("Bylaws update", "Amend article 4 of the bylaws"),
        ("Cafeteria hours", "Extend cafeteria opening hours"),
    ] {
        call(&mut s, api.create(TopicDraft::new(title, description), CancelHandle::new()))?;
    }

    let mut ui = Ui {
        sort: vec![SortItem::new("title", "asc")],
        ..Ui::default()
    };
    s.compose(|s| app(s, &api, &ui));

    // a second click on the column header supersedes the first sort
    ui.sort = vec![SortItem::new("title", "desc")];
    let screens = settle(&mut s, &api, &ui)?;
    print(&screens);

    let Some(first) = screens.list.value().content.first().map(|t| t.id) else {
        bail!("topic list came back empty");
    };
    call(&mut s, api.start_session(first, Some(1), CancelHandle::new()))?;
    for (cpf, vote) in [("111.444.777-35", true), ("529.982.247-25", true), ("123.456.789-09", false)] {
        call(&mut s, api.vote(first, cpf.to_string(), vote, CancelHandle::new()))?;
    }

    ui.selected = Some(first);
    screens.list.refresh();
    let screens = settle(&mut s, &api, &ui)?;
    print(&screens);

    s.dispose();
    Ok(())
}
