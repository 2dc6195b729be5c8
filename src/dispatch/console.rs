//! Interactive console over any line-oriented async reader and writer

use super::{DispatchError, InvocationContext, MethodDispatcher};
use crate::contract::MethodDescriptor;
use crate::crypto::Identity;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const COMMAND_PROMPT: &str = "Enter command: ";
pub const VALUE_PROMPT: &str = "Enter value (leave blank for 0): ";
pub const ADDRESS_PROMPT: &str = "Enter address (leave blank for default account): ";
pub const KEY_PROMPT: &str = "Enter private key: ";

/// A read-eval-print session.
///
/// A failed command prints its error and the session goes on. `exit`,
/// `quit` or the end of input close it.
pub struct Session<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Show a prompt and read one line without its terminator; `None` at end of input
    pub async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        self.writer.write_all(prompt.as_bytes()).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub async fn println(&mut self, text: &str) -> std::io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Run commands until the session is closed. Returns how many succeeded.
    pub async fn run(&mut self, dispatcher: &MethodDispatcher) -> std::io::Result<usize> {
        let mut succeeded = 0;

        loop {
            let Some(line) = self.read_line(COMMAND_PROMPT).await? else {
                break;
            };
            let command = line.trim();
            let word = command.strip_suffix(';').unwrap_or(command).trim_end();
            if word == "exit" || word == "quit" {
                break;
            }

            match dispatcher.execute(command, self).await {
                Ok(output) => {
                    succeeded += 1;
                    self.println(&output).await?;
                }
                Err(DispatchError::EndOfInput) => break,
                Err(e) => {
                    log::debug!("Command failed: {:?}", e);
                    self.println(&e.to_string()).await?;
                }
            }
        }

        self.println("Exiting program...").await?;
        Ok(succeeded)
    }

    async fn prompt(&mut self, prompt: &str) -> Result<String, DispatchError> {
        self.read_line(prompt)
            .await?
            .map(|line| line.trim().to_string())
            .ok_or(DispatchError::EndOfInput)
    }
}

#[async_trait]
impl<R, W> InvocationContext for Session<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn value(&mut self, _method: &MethodDescriptor) -> Result<String, DispatchError> {
        self.prompt(VALUE_PROMPT).await
    }

    async fn identity(&mut self) -> Result<Option<Identity>, DispatchError> {
        let address = self.prompt(ADDRESS_PROMPT).await?;
        if address.is_empty() {
            return Ok(None);
        }
        let key = zeroize::Zeroizing::new(self.prompt(KEY_PROMPT).await?);
        Ok(Some(Identity::new(&address, &key)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use crate::crypto::{format_address, AccountCredentials};
    use crate::ledger::LedgerClient;
    use crate::test_utils::{escrow_interface, FakeLedger};
    use std::sync::Arc;

    async fn dispatcher(ledger: &Arc<FakeLedger>) -> MethodDispatcher {
        let client = Arc::new(LedgerClient::new(ledger.clone(), FakeLedger::settings()));
        let interface = Arc::new(escrow_interface());
        let seller = ledger.seller_key();
        let seller_credentials =
            AccountCredentials::new(format_address(&seller.address()), seller.private_key_hex());

        let receipt = Transaction::deployment(interface.clone(), FakeLedger::BYTE_CODE, &[])
            .unwrap()
            .signer(seller_credentials.identity().unwrap())
            .submit(&client)
            .await
            .unwrap();

        MethodDispatcher::new(client, interface, receipt.contract_address.unwrap())
            .with_default_account(seller_credentials)
    }

    async fn run(dispatcher: &MethodDispatcher, input: &str) -> (usize, String) {
        let mut session = Session::new(input.as_bytes(), Vec::new());
        let succeeded = session.run(dispatcher).await.unwrap();
        let (_, output) = session.into_inner();
        (succeeded, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_session_runs_until_exit() {
        let ledger = Arc::new(FakeLedger::new());
        let dispatcher = dispatcher(&ledger).await;
        let buyer = ledger.buyer_key(0);

        let input = format!(
            "getNumberOfOrders()\ncreateOrder(1);\n1000\n{}\n{}\ngetNumberOfOrders()\nexit\ngetNumberOfOrders()\n",
            format_address(&buyer.address()),
            buyer.private_key_hex()
        );
        let (succeeded, output) = run(&dispatcher, &input).await;

        assert_eq!(succeeded, 3);
        assert!(output.contains(VALUE_PROMPT));
        assert!(output.contains(ADDRESS_PROMPT));
        assert!(output.contains(KEY_PROMPT));
        assert!(output.contains("Events: 1"));
        assert!(output.ends_with("Enter command: Exiting program...\n"));
        assert!(dispatcher.client().wallet().is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_printed_and_session_continues() {
        let ledger = Arc::new(FakeLedger::new());
        let dispatcher = dispatcher(&ledger).await;

        let input = "bogus(1)\ngetOrder()\ncreateOrder(1)\nabc\n\ngetNumberOfOrders()\n";
        let (succeeded, output) = run(&dispatcher, input).await;

        assert_eq!(succeeded, 1);
        assert!(output.contains("Method is not defined in the interface"));
        assert!(output.contains("Method argument count mismatch"));
        assert!(output.contains("Value must be a non-negative integer"));
        // End of input closes the session
        assert!(output.ends_with("Exiting program...\n"));
    }

    #[tokio::test]
    async fn test_exit_accepts_trailing_semicolon() {
        let ledger = Arc::new(FakeLedger::new());
        let dispatcher = dispatcher(&ledger).await;

        let (succeeded, output) = run(&dispatcher, "exit;\ngetNumberOfOrders()\n").await;
        assert_eq!(succeeded, 0);
        assert_eq!(output, "Enter command: Exiting program...\n");

        let input = "getNumberOfOrders()\nquit;\ngetNumberOfOrders()\n";
        let (succeeded, _) = run(&dispatcher, input).await;
        assert_eq!(succeeded, 1);
    }

    #[tokio::test]
    async fn test_key_must_match_address() {
        let ledger = Arc::new(FakeLedger::new());
        let dispatcher = dispatcher(&ledger).await;
        let sent = ledger.raw_transactions();

        let input = format!(
            "confirmOrder(0)\n{}\n{}\nquit\n",
            format_address(&ledger.buyer_address(0)),
            ledger.buyer_key(1).private_key_hex()
        );
        let (succeeded, output) = run(&dispatcher, &input).await;

        assert_eq!(succeeded, 0);
        assert!(output.contains("Signing key does not match address"));
        assert_eq!(ledger.raw_transactions(), sent);
    }
}
