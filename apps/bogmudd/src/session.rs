//! One connected client, from name prompt to disconnect.
//!
//! A session owns the socket and nothing else. Outbound text flows through
//! two channels into a single writer task: a raw byte lane for telnet
//! replies and login prompts, and the player's string mailbox, which the
//! room bus also publishes into. Everything the player sees after login
//! rides the mailbox, so command replies and room narration stay in order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use bogio::{decode_line, pop_line, IacParser};
use bogworld::{validate_name, PendingAction, Player, Progress, World, WorldError};

const NAME_PROMPT: &str = "What is your name, weary adventurer? ";

/// Drive one client connection to completion. Returns when the peer hangs
/// up, the player quits, or the socket errors out.
pub async fn run<S>(stream: S, world: Arc<World>, cooldown: Duration, mailbox: usize) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut rd, mut wr) = tokio::io::split(stream);

    let (raw_tx, mut raw_rx) = mpsc::channel::<Bytes>(128);
    let (mail_tx, mut mail_rx) = mpsc::channel::<String>(mailbox.max(1));
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(bytes) = raw_rx.recv() => {
                    if wr.write_all(&bytes[..]).await.is_err() {
                        break;
                    }
                }
                Some(text) = mail_rx.recv() => {
                    if wr.write_all(text.as_bytes()).await.is_err()
                        || wr.write_all(b"\r\n").await.is_err()
                    {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    let mut player: Option<Player> = None;
    let outcome = drive(&mut rd, &world, &raw_tx, &mail_tx, &mut player, cooldown).await;

    if let Some(player) = &player {
        world.remove_player(player);
    }
    drop(raw_tx);
    drop(mail_tx);
    let _ = writer.await;
    outcome
}

async fn drive<R>(
    rd: &mut R,
    world: &Arc<World>,
    raw_tx: &mpsc::Sender<Bytes>,
    mail_tx: &mpsc::Sender<String>,
    player: &mut Option<Player>,
    cooldown: Duration,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    raw_tx
        .send(Bytes::from_static(NAME_PROMPT.as_bytes()))
        .await
        .ok();

    let mut iac = IacParser::new();
    let mut linebuf: Vec<u8> = Vec::with_capacity(8 * 1024);
    let mut pending: Option<PendingAction> = None;
    let mut next_command_at = Instant::now();
    let mut buf = [0u8; 4096];

    loop {
        let n = rd.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let (data, replies) = iac.parse(&buf[..n]);
        if !replies.is_empty() {
            raw_tx.send(Bytes::from(replies)).await.ok();
        }
        linebuf.extend_from_slice(&data);

        while let Some(raw) = pop_line(&mut linebuf) {
            let line = decode_line(&raw);

            if player.is_none() {
                match validate_name(&line) {
                    Ok(()) => {
                        let joined = world.add_player(&line, mail_tx.clone());
                        joined.init();
                        *player = Some(joined);
                    }
                    Err(problem) => {
                        raw_tx
                            .send(Bytes::from(format!("{problem}\r\n{NAME_PROMPT}")))
                            .await
                            .ok();
                    }
                }
                continue;
            }

            // Blank lines never mean anything, and quit always does, even
            // mid-disambiguation.
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("quit") {
                return Ok(());
            }

            // A suspended action gets the line before the command parser
            // ever sees it.
            if let Some(action) = pending.take() {
                match action.advance(&line) {
                    Progress::Await {
                        pending: next,
                        prompt,
                    } => {
                        mail_tx.send(prompt).await.ok();
                        pending = Some(next);
                    }
                    Progress::Complete(Ok(reply)) => {
                        if !reply.is_empty() {
                            mail_tx.send(reply).await.ok();
                        }
                    }
                    Progress::Complete(Err(err)) => {
                        mail_tx.send(err.to_string()).await.ok();
                    }
                    Progress::Aborted => {}
                }
                continue;
            }

            let wait = next_command_at.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                mail_tx
                    .send(format!(
                        "You need to catch your breath. Try again in {:.1}s",
                        wait.as_secs_f64()
                    ))
                    .await
                    .ok();
                continue;
            }

            if let Some(current) = player.as_ref() {
                match world.parse(current, &line) {
                    Ok(reply) => {
                        if !reply.is_empty() {
                            mail_tx.send(reply).await.ok();
                        }
                        next_command_at = Instant::now() + cooldown;
                    }
                    // A fresh ambiguity starts the question flow and holds
                    // the cooldown until the action actually runs.
                    Err(WorldError::Ambiguous(ambiguity)) => {
                        let (action, prompt) = PendingAction::start(ambiguity);
                        mail_tx.send(prompt).await.ok();
                        pending = Some(action);
                    }
                    Err(err) => {
                        mail_tx.send(err.to_string()).await.ok();
                        next_command_at = Instant::now() + cooldown;
                    }
                }
            }
        }
    }
}
