//! CLI client for the `reflexd` daemon.
//!
//! Examples:
//!   reflex-cli status
//!   reflex-cli start color-change
//!   reflex-cli press
//!   reflex-cli key left
//!   reflex-cli entry 48201
//!   reflex-cli history color-change
//!   reflex-cli dist click-tracker
//!
//! By default it talks to 127.0.0.1:9697; override with `--addr host:port`.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use reflex::result::TestKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Request {
    GetState,
    StartTest { kind: TestKind },
    Press,
    Hit,
    Key { direction: String },
    Cell { index: u8 },
    Entry { digits: String },
    AbortTest,
    History,
    HistoryByKind { kind: TestKind },
    BestResult { kind: TestKind },
    DeleteResult { id: String },
    ClearHistory,
    Percentile { kind: TestKind, value: f64 },
    Distribution { kind: TestKind },
    OwnerRecords,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Response {
    State(Value),
    Results(Vec<Value>),
    Best(Option<Value>),
    Records(Vec<Value>),
    Percentile { value: f64 },
    Distribution { total: usize, buckets: Vec<BucketDto> },
    Success { message: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BucketDto {
    lo: f64,
    hi: f64,
    count: usize,
}

fn usage() -> ! {
    eprintln!("reflex-cli (talks to reflexd @ 127.0.0.1:9697 by default)");
    eprintln!("Usage: reflex-cli [--addr host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  status                      Show session state");
    eprintln!("  start <test>                Start a test (click-tracker|color-change|");
    eprintln!("                              sequence-memory|number-flash|direction-react|audio-react)");
    eprintln!("  press                       Reaction press (color-change, audio-react)");
    eprintln!("  hit                         Report a click on the tracker target");
    eprintln!("  key <up|down|left|right>    Direction key");
    eprintln!("  cell <0-8>                  Sequence grid click");
    eprintln!("  entry <digits>              Number-flash answer");
    eprintln!("  abort                       Tear the active test down");
    eprintln!("  history [test]              List recorded results");
    eprintln!("  best <test>                 Show the personal best");
    eprintln!("  delete <id>                 Delete one result");
    eprintln!("  clear                       Clear the whole history");
    eprintln!("  percentile <test> <value>   Rank a value against the pool");
    eprintln!("  dist <test>                 Population distribution");
    eprintln!("  records                     Pool records for the configured owner");
    eprintln!("  shutdown                    Stop the daemon");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = "127.0.0.1:9697".to_string();
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

fn parse_kind(s: &str) -> TestKind {
    TestKind::from_str(s).unwrap_or_else(|| {
        eprintln!("unknown test '{s}'");
        process::exit(1);
    })
}

fn send_request(addr: &str, req: &Request) -> Result<Response, String> {
    let mut stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|e| format!("set_read_timeout: {e}"))?;
    let mut reader = BufReader::new(stream.try_clone().map_err(|e| format!("clone: {e}"))?);

    let line = serde_json::to_string(req).map_err(|e| format!("serialize: {e}"))?;
    stream
        .write_all(line.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .map_err(|e| format!("send: {e}"))?;

    let mut resp_line = String::new();
    reader
        .read_line(&mut resp_line)
        .map_err(|e| format!("recv: {e}"))?;
    serde_json::from_str(&resp_line).map_err(|e| format!("parse response: {e}"))
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

fn print_state(s: &Value) {
    let state = field(s, "state").and_then(Value::as_str).unwrap_or("?");
    let kind = field(s, "kind").and_then(Value::as_str).unwrap_or("-");
    let history_len = field(s, "historyLen")
        .or_else(|| field(s, "history_len"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    println!("test={kind:<16} state={state:<10} history={history_len}");

    let mut live = Vec::new();
    for key in [
        "round",
        "totalRounds",
        "secondsLeft",
        "level",
        "clicks",
        "target",
        "direction",
        "highlightedCell",
        "inputProgress",
        "digits",
        "lastReactionMs",
        "accuracy",
    ] {
        if let Some(v) = field(s, key) {
            live.push(format!("{key}={v}"));
        }
    }
    if !live.is_empty() {
        println!("{}", live.join("  "));
    }

    if let Some(result) = field(s, "lastResult") {
        println!("last result: {}", summarize_result(result));
    }
}

fn summarize_result(r: &Value) -> String {
    let kind = field(r, "type").and_then(Value::as_str).unwrap_or("?");
    let id = field(r, "id").and_then(Value::as_str).unwrap_or("?");
    let mut parts = vec![format!("[{kind}] id={id}")];
    for key in [
        "averageTime",
        "totalClicks",
        "fastestTime",
        "slowestTime",
        "accuracy",
        "score",
        "percentile",
    ] {
        if let Some(v) = field(r, key) {
            parts.push(format!("{key}={v}"));
        }
    }
    if field(r, "isPersonalBest").and_then(Value::as_bool) == Some(true) {
        parts.push("PB".to_string());
    }
    if field(r, "success").and_then(Value::as_bool) == Some(false) {
        parts.push("FAILED".to_string());
    }
    parts.join(" ")
}

fn print_distribution(total: usize, buckets: &[BucketDto]) {
    if buckets.is_empty() {
        println!("no population data");
        return;
    }
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(1).max(1);
    for b in buckets {
        let bar_len = b.count * 40 / max;
        println!(
            "{:>8.1} - {:>8.1} | {:<40} {}",
            b.lo,
            b.hi,
            "#".repeat(bar_len),
            b.count
        );
    }
    println!("({total} records)");
}

fn main() {
    let (addr, args) = parse_args();
    let cmd = &args[0];

    let make_error = |msg: &str| -> ! {
        eprintln!("{}", msg);
        process::exit(1);
    };

    let req = match cmd.as_str() {
        "status" => Request::GetState,
        "start" => {
            if args.len() < 2 {
                usage();
            }
            Request::StartTest {
                kind: parse_kind(&args[1]),
            }
        }
        "press" => Request::Press,
        "hit" => Request::Hit,
        "key" => {
            if args.len() < 2 {
                usage();
            }
            let direction = args[1].clone();
            if !["up", "down", "left", "right"].contains(&direction.as_str()) {
                make_error("direction must be up|down|left|right");
            }
            Request::Key { direction }
        }
        "cell" => {
            if args.len() < 2 {
                usage();
            }
            let index: u8 = args[1]
                .parse()
                .unwrap_or_else(|_| make_error("cell must be 0-8"));
            Request::Cell { index }
        }
        "entry" => {
            if args.len() < 2 {
                usage();
            }
            Request::Entry {
                digits: args[1].clone(),
            }
        }
        "abort" => Request::AbortTest,
        "history" => {
            if args.len() >= 2 {
                Request::HistoryByKind {
                    kind: parse_kind(&args[1]),
                }
            } else {
                Request::History
            }
        }
        "best" => {
            if args.len() < 2 {
                usage();
            }
            Request::BestResult {
                kind: parse_kind(&args[1]),
            }
        }
        "delete" => {
            if args.len() < 2 {
                usage();
            }
            Request::DeleteResult {
                id: args[1].clone(),
            }
        }
        "clear" => Request::ClearHistory,
        "percentile" => {
            if args.len() < 3 {
                usage();
            }
            let value: f64 = args[2]
                .parse()
                .unwrap_or_else(|_| make_error("value must be a number"));
            Request::Percentile {
                kind: parse_kind(&args[1]),
                value,
            }
        }
        "dist" => {
            if args.len() < 2 {
                usage();
            }
            Request::Distribution {
                kind: parse_kind(&args[1]),
            }
        }
        "records" => Request::OwnerRecords,
        "shutdown" => Request::Shutdown,
        _ => usage(),
    };

    match send_request(&addr, &req) {
        Ok(Response::State(s)) => print_state(&s),
        Ok(Response::Results(results)) => {
            if results.is_empty() {
                println!("no results");
            }
            for r in &results {
                println!("{}", summarize_result(r));
            }
        }
        Ok(Response::Best(best)) => match best {
            Some(r) => println!("{}", summarize_result(&r)),
            None => println!("no result for that test yet"),
        },
        Ok(Response::Records(records)) => {
            if records.is_empty() {
                println!("no records");
            }
            for r in &records {
                println!("{r}");
            }
        }
        Ok(Response::Percentile { value }) => println!("better than {value}% of the pool"),
        Ok(Response::Distribution { total, buckets }) => print_distribution(total, &buckets),
        Ok(Response::Success { message }) => println!("{message}"),
        Ok(Response::Error { message }) => {
            eprintln!("Error: {message}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed: {e}");
            process::exit(1);
        }
    }
}
