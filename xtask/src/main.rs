use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::time::Instant;
use rand::{seq::SliceRandom, thread_rng};
use hdrhistogram::Histogram;

fn main() -> anyhow::Result<()> {
    let bin = std::env::args().nth(1).unwrap_or_else(|| "target/release/genline".to_string());
    let total = 50usize;
    let prompts = vec!["Hello", "Once upon a time", "The capital of France is", "fn main() {", "Dear diary,"];

    let mut child = Command::new(&bin)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;
    let mut stdin = child.stdin.take().expect("child stdin");
    let mut stdout = BufReader::new(child.stdout.take().expect("child stdout"));

    let mut hist = Histogram::<u64>::new(3)?;
    let mut errors = 0usize;
    let start = Instant::now();

    for _ in 0..total {
        let p = {
            let mut rng = thread_rng();
            prompts.choose(&mut rng).unwrap().to_string()
        };
        let t0 = Instant::now();
        serde_json::to_writer(&mut stdin, &serde_json::json!({ "prompt": p }))?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;

        let mut line = String::new();
        if stdout.read_line(&mut line)? == 0 {
            anyhow::bail!("worker closed stdout");
        }
        let dur = t0.elapsed();
        let v: serde_json::Value = serde_json::from_str(&line)?;
        if v.get("error").is_some() {
            errors += 1;
        } else {
            hist.record(dur.as_millis() as u64).ok();
        }
    }

    // blank line shuts the worker down
    stdin.write_all(b"\n")?;
    stdin.flush()?;
    drop(stdin);
    let status = child.wait()?;

    println!("ran {} reqs in {:?} (worker exit {:?})", total, start.elapsed(), status.code());
    println!("errors: {}", errors);
    println!("p50: {} ms", hist.value_at_quantile(0.50));
    println!("p95: {} ms", hist.value_at_quantile(0.95));
    println!("p99: {} ms", hist.value_at_quantile(0.99));
    Ok(())
}
