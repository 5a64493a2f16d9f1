use std::io;
use std::sync::Arc;

use geoguard::{
    BalanceRefresher, EventSource, GuardConfig, HttpWalletProvider, LookupForm, MintForm,
    NodeRegistry, Session, SessionManager,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Cli, Command, LookupArgs, MintArgs, Network};
use crate::error::CliError;
use crate::output;

/// Wallet, session and registry wired from the command line.
struct App {
    config: GuardConfig,
    network: Network,
    provider: Arc<HttpWalletProvider>,
    session: SessionManager<HttpWalletProvider>,
    json: bool,
}

impl App {
    fn new(cli: &Cli) -> Result<Self, CliError> {
        let mut config = cli.network.config(&cli.wallet_url);
        if let Some(url) = &cli.events_url {
            config.events = EventSource::WebSocket(url.clone());
        }
        config.validate()?;

        let provider = Arc::new(HttpWalletProvider::new(
            &config.wallet_url,
            config.events.clone(),
        ));
        let session = SessionManager::new(Arc::clone(&provider));
        Ok(Self {
            config,
            network: cli.network,
            provider,
            session,
            json: cli.json,
        })
    }

    fn registry(&self) -> NodeRegistry<HttpWalletProvider> {
        NodeRegistry::new(Arc::clone(&self.provider), self.config.contract_address)
            .with_receipt_poll_interval(self.config.receipt_poll_interval)
            .with_confirmations(self.config.confirmations)
    }

    fn refresher(&self) -> BalanceRefresher<HttpWalletProvider> {
        BalanceRefresher::new(
            Arc::clone(&self.provider),
            self.config.balances.clone(),
            self.config.refresh_interval,
        )
    }

    /// Reuse an authorized account, asking the wallet only if there is none.
    async fn connect(&self) -> Result<Session, CliError> {
        let session = self.session.init().await?;
        if session.is_active() {
            return Ok(session);
        }
        Ok(self.session.connect().await?)
    }
}

pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    let app = App::new(&cli)?;
    info!(
        wallet = %app.config.wallet_url,
        network = ?app.network,
        contract = %app.config.contract_address,
        "geoguard starting"
    );

    let result = match cli.command {
        Command::Status => status(&app).await,
        Command::Watch => watch(&app, cancel).await,
        Command::Mint(args) => mint(&app, args).await,
        Command::Lookup(args) => lookup(&app, args).await,
        Command::LastTokenId => last_token_id(&app).await,
    };

    app.session.disconnect();
    app.provider.shutdown();
    result
}

async fn status(app: &App) -> Result<(), CliError> {
    let session = app.connect().await?;
    let balances = app.refresher().refresh(&session).await;
    output::write_status(&mut io::stdout(), &session, &balances, app.json)
}

async fn watch(app: &App, cancel: CancellationToken) -> Result<(), CliError> {
    app.provider.start();
    let mut last = app.connect().await?;
    output::write_session(&mut io::stdout(), &last, app.json)?;

    let refresher = Arc::new(app.refresher());
    let mut session_rx = app.session.subscribe();
    let mut balances_rx = refresher.subscribe();
    let refresh_cancel = cancel.child_token();
    let handle = Arc::clone(&refresher).spawn(app.session.subscribe(), refresh_cancel.clone());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = session_rx.borrow_and_update().clone();
                if session != last {
                    output::write_session(&mut io::stdout(), &session, app.json)?;
                    last = session;
                }
            }
            changed = balances_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let balances = *balances_rx.borrow_and_update();
                if last.is_active() {
                    output::write_balances(&mut io::stdout(), &balances, app.json)?;
                }
            }
        }
    }

    refresh_cancel.cancel();
    if let Err(e) = handle.await {
        warn!(error = %e, "balance refresher task failed");
    }
    Ok(())
}

async fn mint(app: &App, args: MintArgs) -> Result<(), CliError> {
    let session = app.connect().await?;
    let mut form = MintForm::for_account(session.address);
    if let Some(to) = args.to {
        form.to = to;
    }
    form.token_id = args.token_id.unwrap_or_default();
    form.node_id = args.node_id.unwrap_or_default();
    let request = form.validate()?;

    app.session.require_address()?;
    app.session.ensure_chain(app.network.chain_id())?;

    let outcome = app
        .registry()
        .with_confirmations(args.confirmations)
        .mint_token(request.token_id, &request.node_id, Some(request.to))
        .await?;
    output::write_mint(
        &mut io::stdout(),
        &outcome,
        &request.to,
        &request.node_id,
        app.json,
    )
}

async fn lookup(app: &App, args: LookupArgs) -> Result<(), CliError> {
    let mut form = LookupForm {
        token_id: args.token_id.unwrap_or_default(),
        account: args.account.unwrap_or_default(),
    };
    if form.account.is_empty() {
        let session = app.connect().await?;
        form.account = LookupForm::for_account(session.address).account;
    }
    let request = form.validate()?;

    let node_id = app
        .registry()
        .get_node_id(request.token_id, request.account)
        .await?;
    output::write_node_id(
        &mut io::stdout(),
        request.token_id,
        &request.account,
        &node_id,
        app.json,
    )
}

async fn last_token_id(app: &App) -> Result<(), CliError> {
    let last = app.registry().last_token_id().await?;
    output::write_last_token_id(&mut io::stdout(), last, app.json)
}
