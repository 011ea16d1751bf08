use alloy_primitives::{Address, ChainId};
use arc_wallets::{
    Eip1193Provider, ProviderEvent, ProviderRpcError, RequestArguments, normalize_chain_id,
    provider::methods, to_hex_chain_id,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    fmt,
    sync::Arc,
};
use tokio::sync::broadcast;

type Response = Result<Value, ProviderRpcError>;

#[derive(Clone)]
struct Handler(Arc<dyn Fn(&RequestArguments) -> Response + Send + Sync>);

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// An in-memory wallet.
///
/// Without scripting it behaves like a well-mannered browser wallet:
/// - `eth_chainId` reports the active chain, or `null` if there is none;
/// - `wallet_switchEthereumChain` activates a known chain and fails with `4902` otherwise;
/// - `wallet_addEthereumChain` registers and activates the chain;
/// - `eth_requestAccounts` connects, `eth_accounts` returns the accounts once connected.
///
/// Responses queued with [`script`](Self::script) are returned first, verbatim and without
/// side effects, then those of a handler installed with [`handle_with`](Self::handle_with).
/// Every request is recorded.
#[derive(Debug)]
pub struct MockWallet {
    state: Mutex<MockState>,
    events: broadcast::Sender<ProviderEvent>,
}

#[derive(Debug, Default)]
struct MockState {
    chain_id: Option<ChainId>,
    known_chains: BTreeSet<ChainId>,
    accounts: Vec<Address>,
    connected: bool,
    scripted: HashMap<String, VecDeque<Response>>,
    handlers: HashMap<String, Handler>,
    calls: Vec<RequestArguments>,
}

impl Default for MockWallet {
    fn default() -> Self {
        let (events, _) = broadcast::channel(64);
        Self { state: Mutex::default(), events }
    }
}

impl MockWallet {
    /// A wallet that knows and is connected to `chain_id`.
    pub fn on_chain(chain_id: ChainId) -> Self {
        let wallet = Self::default();
        {
            let mut state = wallet.state.lock();
            state.chain_id = Some(chain_id);
            state.known_chains.insert(chain_id);
        }
        wallet
    }

    /// Adds a chain the wallet can switch to without registering it first.
    pub fn with_known_chain(self, chain_id: ChainId) -> Self {
        self.state.lock().known_chains.insert(chain_id);
        self
    }

    pub fn with_accounts(self, accounts: impl IntoIterator<Item = Address>) -> Self {
        self.state.lock().accounts = accounts.into_iter().collect();
        self
    }

    /// Marks the wallet as already connected, so `eth_accounts` returns the accounts.
    pub fn connected(self) -> Self {
        self.state.lock().connected = true;
        self
    }

    /// Queues a response for the next unscripted call of `method`.
    pub fn script(self, method: &str, response: Response) -> Self {
        self.push_script(method, response);
        self
    }

    pub fn push_script(&self, method: &str, response: Response) {
        self.state.lock().scripted.entry(method.to_string()).or_default().push_back(response);
    }

    /// Answers every unscripted call of `method` with `handler`, e.g. to fake a contract behind
    /// `eth_call`.
    pub fn handle_with(
        self,
        method: &str,
        handler: impl Fn(&RequestArguments) -> Response + Send + Sync + 'static,
    ) -> Self {
        self.state.lock().handlers.insert(method.to_string(), Handler(Arc::new(handler)));
        self
    }

    /// The active chain.
    pub fn active_chain(&self) -> Option<ChainId> {
        self.state.lock().chain_id
    }

    /// Activates `chain_id` out of band, as if the user switched in the wallet UI.
    pub fn set_chain(&self, chain_id: ChainId) {
        self.state.lock().chain_id = Some(chain_id);
        self.emit(ProviderEvent::ChainChanged(to_hex_chain_id(chain_id)));
    }

    pub fn knows_chain(&self, chain_id: ChainId) -> bool {
        self.state.lock().known_chains.contains(&chain_id)
    }

    /// Sends an event to all subscribers.
    pub fn emit(&self, event: ProviderEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// All requests received so far.
    pub fn calls(&self) -> Vec<RequestArguments> {
        self.state.lock().calls.clone()
    }

    /// The names of all requested methods, in order.
    pub fn methods(&self) -> Vec<String> {
        self.state.lock().calls.iter().map(|call| call.method.to_string()).collect()
    }

    /// The params of every call to `method`, in order.
    pub fn params_of(&self, method: &str) -> Vec<Option<Value>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .map(|call| call.params.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state.lock().calls.iter().filter(|call| call.method == method).count()
    }

    fn handle(&self, args: &RequestArguments) -> Response {
        let mut state = self.state.lock();
        state.calls.push(args.clone());

        if let Some(response) =
            state.scripted.get_mut(&*args.method).and_then(VecDeque::pop_front)
        {
            trace!(method = %args.method, ?response, "scripted response");
            return response;
        }
        if let Some(Handler(handler)) = state.handlers.get(&*args.method).cloned() {
            drop(state);
            return handler(args);
        }

        match &*args.method {
            methods::ETH_CHAIN_ID => {
                Ok(state.chain_id.map(|id| json!(to_hex_chain_id(id))).unwrap_or(Value::Null))
            }
            methods::ETH_ACCOUNTS => {
                let accounts = if state.connected { state.accounts.clone() } else { vec![] };
                Ok(json!(accounts))
            }
            methods::ETH_REQUEST_ACCOUNTS => {
                state.connected = true;
                Ok(json!(state.accounts))
            }
            methods::WALLET_SWITCH_ETHEREUM_CHAIN => {
                let chain_id = requested_chain(args)?;
                if !state.known_chains.contains(&chain_id) {
                    return Err(ProviderRpcError::with_message(
                        arc_wallets::ProviderErrorCode::UnrecognizedChain,
                        format!("Unrecognized chain ID \"{}\"", to_hex_chain_id(chain_id)),
                    ));
                }
                state.chain_id = Some(chain_id);
                drop(state);
                self.emit(ProviderEvent::ChainChanged(to_hex_chain_id(chain_id)));
                Ok(Value::Null)
            }
            methods::WALLET_ADD_ETHEREUM_CHAIN => {
                let chain_id = requested_chain(args)?;
                state.known_chains.insert(chain_id);
                state.chain_id = Some(chain_id);
                drop(state);
                self.emit(ProviderEvent::ChainChanged(to_hex_chain_id(chain_id)));
                Ok(Value::Null)
            }
            _ => Err(ProviderRpcError::method_not_found()),
        }
    }
}

#[async_trait]
impl Eip1193Provider for MockWallet {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        self.handle(&args)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Reads `params[0].chainId`.
fn requested_chain(args: &RequestArguments) -> Result<ChainId, ProviderRpcError> {
    let invalid = || {
        ProviderRpcError::with_message(
            arc_wallets::ProviderErrorCode::InvalidParams,
            "expected [{ chainId }]",
        )
    };
    let chain_id = args
        .params
        .as_ref()
        .and_then(|params| params.get(0))
        .and_then(|param| param.get("chainId"))
        .and_then(Value::as_str)
        .ok_or_else(invalid)?;
    normalize_chain_id(Some(chain_id)).ok().flatten().ok_or_else(invalid)
}
