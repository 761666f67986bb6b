//! Mock wallet connector
//!
//! Scriptable connector for tests and offline demo runs: sequence numbers
//! are played back from a script, submit outcomes are programmable, and
//! every call is counted so tests can assert polling really stopped.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tokio::time::Duration;

use super::{AccountState, ConnectorError, WalletConnector};
use crate::core_types::{AccountRef, SeqNum, SubmissionReceipt, TransferRequest};

/// What `submit` should do when called.
#[derive(Debug, Clone)]
pub enum SubmitScript {
    /// Return a receipt with this payload.
    Accept(String),
    /// Simulate the user declining the signing prompt.
    Reject,
    /// Simulate a connector transport failure.
    Fail(String),
    /// Never resolve (user left the signing prompt open). Used to test
    /// cancellation during `AwaitingSignature`.
    Hang,
}

pub struct MockConnector {
    account_tx: watch::Sender<Option<AccountRef>>,
    /// Scripted account states, consumed one per `account_state` call; the
    /// last entry repeats once the script runs out.
    states: Mutex<VecDeque<AccountState>>,
    submit_script: Mutex<SubmitScript>,
    submitted: Mutex<Vec<TransferRequest>>,
    state_calls: AtomicUsize,
}

impl MockConnector {
    pub fn new(account: Option<AccountRef>) -> Self {
        let (account_tx, _) = watch::channel(account);
        Self {
            account_tx,
            states: Mutex::new(VecDeque::new()),
            submit_script: Mutex::new(SubmitScript::Accept("signed-payload".to_string())),
            submitted: Mutex::new(Vec::new()),
            state_calls: AtomicUsize::new(0),
        }
    }

    pub fn connected(address: &str) -> Self {
        Self::new(Some(AccountRef::from(address)))
    }

    /// Publish a wallet account change to subscribers.
    pub fn set_account(&self, account: Option<AccountRef>) {
        let _ = self.account_tx.send(account);
    }

    /// Script the sequence numbers returned by successive
    /// `account_state` calls. `hash` is returned as the last transaction
    /// hash alongside every state.
    pub fn script_sequence(&self, seqnos: &[SeqNum], hash: &str) {
        let mut states = self.states.lock().unwrap();
        states.clear();
        for &seqno in seqnos {
            states.push_back(AccountState {
                sequence_number: seqno,
                last_tx_hash: hash.to_string(),
            });
        }
    }

    pub fn script_submit(&self, script: SubmitScript) {
        *self.submit_script.lock().unwrap() = script;
    }

    pub fn submitted_requests(&self) -> Vec<TransferRequest> {
        self.submitted.lock().unwrap().clone()
    }

    /// Number of `account_state` calls observed so far.
    pub fn state_call_count(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletConnector for MockConnector {
    fn current_account(&self) -> Option<AccountRef> {
        self.account_tx.borrow().clone()
    }

    fn accounts(&self) -> watch::Receiver<Option<AccountRef>> {
        self.account_tx.subscribe()
    }

    async fn account_state(&self, _account: &AccountRef) -> Result<AccountState, ConnectorError> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);

        let mut states = self.states.lock().unwrap();
        match states.len() {
            0 => Err(ConnectorError::Connector(
                "no scripted account state".to_string(),
            )),
            1 => Ok(states.front().cloned().unwrap()),
            _ => Ok(states.pop_front().unwrap()),
        }
    }

    async fn submit(
        &self,
        request: TransferRequest,
    ) -> Result<SubmissionReceipt, ConnectorError> {
        self.submitted.lock().unwrap().push(request);

        let script = self.submit_script.lock().unwrap().clone();
        match script {
            SubmitScript::Accept(payload) => Ok(SubmissionReceipt {
                signed_payload: payload,
            }),
            SubmitScript::Reject => Err(ConnectorError::UserRejected),
            SubmitScript::Fail(reason) => Err(ConnectorError::Connector(reason)),
            SubmitScript::Hang => {
                // Effectively forever; callers are expected to cancel.
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(ConnectorError::Connector("unreachable".to_string()))
            }
        }
    }
}
