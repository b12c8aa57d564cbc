//! Command dispatch

use siaduan_action_executor::ActionExecutor;
use siaduan_chain_client::{ProtocolChain, WalletConnector};
use siaduan_common::{ActionKind, ActionSlot};
use siaduan_protocol_store::ProtocolStore;
use tracing::debug;

use crate::command::{Command, HELP};
use crate::config::DashboardConfig;
use crate::render;

/// What the loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Store, executor and wallet behind one command interface
pub struct Dashboard<W: WalletConnector> {
    connector: W,
    store: ProtocolStore<W::Chain>,
    executor: ActionExecutor<W::Chain>,
    config: DashboardConfig,
}

impl<W: WalletConnector> Dashboard<W> {
    pub fn new(connector: W, config: DashboardConfig) -> Self {
        let store = ProtocolStore::new(config.store_config());
        let executor = ActionExecutor::new(store.clone()).with_approval_policy(config.approval);
        Self {
            connector,
            store,
            executor,
            config,
        }
    }

    pub fn store(&self) -> &ProtocolStore<W::Chain> {
        &self.store
    }

    pub fn executor(&self) -> &ActionExecutor<W::Chain> {
        &self.executor
    }

    /// Parse and run one input line
    pub async fn handle_line(&self, line: &str) -> Option<Reply> {
        match Command::parse(line) {
            Ok(Some(command)) => Some(self.handle(command).await),
            Ok(None) => None,
            Err(e) => Some(Reply::Text(e.to_string())),
        }
    }

    pub async fn handle(&self, command: Command) -> Reply {
        debug!(?command, "dashboard command");
        let chain = &self.config.chain;

        let text = match command {
            Command::Status => self.status(),
            Command::Details => self.details().await,
            Command::Action(_) if self.store.connection().is_wrong_network(chain.chain_id) => {
                format!("switch the wallet to {} ({}) to send transactions", chain.name, chain.chain_id)
            }
            Command::Action(request) => match self.executor.execute(request).await {
                Ok(outcome) => render::outcome(&outcome, chain),
                Err(failure) => render::failure(&failure),
            },
            Command::Max(kind) => match self.executor.max_amount(kind) {
                Ok(amount) => {
                    let unit = if kind == ActionKind::Withdraw { "shares" } else { "mUSDC" };
                    format!("max {}: {} {unit}", kind.to_string().to_lowercase(), render::token_amount(amount))
                }
                Err(e) => e.to_string(),
            },
            Command::Ack(slot) => match self.executor.acknowledge(slot) {
                Ok(()) => format!("{slot} ready"),
                Err(e) => e.to_string(),
            },
            Command::Connect => {
                self.store.connect(&self.connector).await;
                self.status()
            }
            Command::Disconnect => {
                self.store.disconnect();
                "disconnected".to_string()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Reply::Quit,
        };
        Reply::Text(text)
    }

    fn status(&self) -> String {
        let mut out = render::status(&self.store.connection(), &self.store.snapshot(), &self.config.chain);
        for slot in [ActionSlot::Faucet, ActionSlot::Vault, ActionSlot::Rates] {
            let pending = self.executor.pending(slot);
            if pending.kind.is_some() {
                out.push('\n');
                out.push_str(&render::slot(slot, &pending, &self.config.chain));
            }
        }
        out
    }

    async fn details(&self) -> String {
        let Some(client) = self.store.client() else {
            return "not connected".to_string();
        };
        match client.read_protocol_details().await {
            Ok(details) => render::details(&details),
            Err(e) => format!("details unavailable: {e}"),
        }
    }
}
