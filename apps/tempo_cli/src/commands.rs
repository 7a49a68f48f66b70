//! 交互命令解析

use std::path::PathBuf;

/// 从标准输入读到的一条命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    /// 毫秒
    Seek(i64),
    Volume(i32),
    Repeat,
    Shuffle,
    List,
    Status,
    Select(usize),
    Remove(usize),
    Add(PathBuf),
    Clear,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause | stop        transport
  next | prev                playlist navigation
  seek <secs|mm:ss>          jump within the current track
  vol <0-100>                set volume
  repeat | shuffle           toggle flags
  list | status              show playlist / engine state
  goto <n> | remove <n>      select or remove entry n (1-based)
  add <path> | clear         edit the playlist
  help | quit";

/// 解析一行输入。空行返回 `Ok(None)`。
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "play" | "p" => Command::Play,
        "pause" => Command::Pause,
        "stop" | "s" => Command::Stop,
        "next" | "n" => Command::Next,
        "prev" | "previous" => Command::Previous,
        "seek" => Command::Seek(parse_time(rest)?),
        "vol" | "volume" => Command::Volume(
            rest.parse()
                .map_err(|_| format!("invalid volume: {:?}", rest))?,
        ),
        "repeat" => Command::Repeat,
        "shuffle" => Command::Shuffle,
        "list" | "ls" => Command::List,
        "status" => Command::Status,
        "goto" => Command::Select(parse_index(rest)?),
        "remove" | "rm" => Command::Remove(parse_index(rest)?),
        "add" if !rest.is_empty() => Command::Add(PathBuf::from(rest)),
        "add" => return Err("add needs a path".to_string()),
        "clear" => Command::Clear,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(Some(command))
}

/// `90`、`-5` 或 `1:30`，返回毫秒
fn parse_time(text: &str) -> Result<i64, String> {
    let invalid = || format!("invalid time: {:?}", text);
    match text.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
            let seconds: i64 = seconds.parse().map_err(|_| invalid())?;
            Ok((minutes * 60 + seconds) * 1000)
        }
        None => {
            let seconds: f64 = text.parse().map_err(|_| invalid())?;
            Ok((seconds * 1000.0) as i64)
        }
    }
}

/// 1 开始的序号
fn parse_index(text: &str) -> Result<usize, String> {
    match text.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("invalid entry number: {:?}", text)),
    }
}
