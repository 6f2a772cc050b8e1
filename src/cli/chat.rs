use std::env;
use std::io::Write;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::client::{ChatClient, SIGN_IN_MESSAGE, TurnOutcome};

pub async fn run(url: &str, token: Option<String>) -> Result<()> {
    let mut rl = DefaultEditor::new().expect("Editor failed");

    let token = token.or_else(|| env::var("MINDCARE_ID_TOKEN").ok());
    let mut client = ChatClient::new(url, token);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let (tx, mut rx) = mpsc::unbounded_channel::<String>();
                // Print fragments as they stream in
                let printer = tokio::spawn(async move {
                    let mut streamed = String::new();
                    while let Some(fragment) = rx.recv().await {
                        print!("{}", fragment);
                        let _ = std::io::stdout().flush();
                        streamed.push_str(&fragment);
                    }
                    streamed
                });

                let outcome = client.submit_turn(&line, tx).await;
                let streamed = printer.await?;

                match outcome {
                    Ok(TurnOutcome::Skipped) => {}
                    Ok(TurnOutcome::SignInRequired { .. }) => println!("{}", SIGN_IN_MESSAGE),
                    Ok(TurnOutcome::Completed { text, .. }) => {
                        if streamed == text {
                            println!();
                        } else {
                            // The settled text replaced the streamed
                            // fragments (error frame or apology)
                            if !streamed.is_empty() {
                                println!();
                            }
                            println!("{}", text);
                        }
                    }
                    Err(err) => println!("Error: {:?}", err),
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
