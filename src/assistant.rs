//! Wires settings, Google adapters, tools and the agent together.

use crate::agent::{
    Agent, AgentResponse, ChatModel, ConversationSession, OpenAiChatModel, PromptTemplate,
};
use crate::config::{Prompts, Settings};
use crate::error::{Result, TidingsError};
use crate::google::{create_http_client, CredentialStore, Gmail, GoogleAuth, GoogleCalendar, OAuthClient};
use crate::openai::create_client_with_timeout;
use crate::services::{CalendarService, MailService};
use crate::tools::{default_registry, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// The assembled assistant.
pub struct Assistant {
    settings: Settings,
    prompts: Prompts,
    auth: Arc<GoogleAuth>,
    calendar: Arc<dyn CalendarService>,
    mail: Arc<dyn MailService>,
    tools: Arc<ToolRegistry>,
}

impl Assistant {
    /// Build the assistant against the Google APIs named in `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let http = create_http_client(Duration::from_secs(settings.google.timeout_secs))?;
        let store = CredentialStore::new(settings.token_path(), settings.client_secret_path());
        let auth = Arc::new(
            GoogleAuth::new(store, OAuthClient::new(http.clone()))
                .with_interactive(settings.google.interactive_auth)
                .with_redirect_port(settings.google.redirect_port),
        );

        let calendar: Arc<dyn CalendarService> = Arc::new(GoogleCalendar::new(
            http.clone(),
            auth.clone(),
            &settings.google.calendar_api_base,
        ));
        let mail: Arc<dyn MailService> = Arc::new(Gmail::new(
            http,
            auth.clone(),
            &settings.google.gmail_api_base,
        ));

        Self::with_components(settings, prompts, auth, calendar, mail)
    }

    /// Build the assistant from custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        auth: Arc<GoogleAuth>,
        calendar: Arc<dyn CalendarService>,
        mail: Arc<dyn MailService>,
    ) -> Result<Self> {
        let tools = default_registry(calendar.clone(), mail.clone(), &settings)?;

        // One grant has to cover every tool.
        let scopes = tools.required_scopes();
        debug!("Required Google scopes: {}", scopes.join(" "));
        auth.require_scopes(&scopes);

        Ok(Self {
            settings,
            prompts,
            auth,
            calendar,
            mail,
            tools: Arc::new(tools),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn auth(&self) -> Arc<GoogleAuth> {
        self.auth.clone()
    }

    pub fn calendar(&self) -> Arc<dyn CalendarService> {
        self.calendar.clone()
    }

    pub fn mail(&self) -> Arc<dyn MailService> {
        self.mail.clone()
    }

    pub fn tools(&self) -> Arc<ToolRegistry> {
        self.tools.clone()
    }

    /// The configured OpenAI model, or `model_override` if given.
    pub fn openai_model(&self, model_override: Option<&str>) -> Result<Arc<dyn ChatModel>> {
        let client = create_client_with_timeout(Duration::from_secs(self.settings.openai.timeout_secs))?;
        let model = model_override.unwrap_or(self.settings.openai.model.as_str());
        info!("Using model {}", model);
        Ok(Arc::new(OpenAiChatModel::new(
            client,
            model,
            self.settings.openai.temperature,
        )))
    }

    /// An agent over this assistant's tools.
    pub fn agent(&self, model: Arc<dyn ChatModel>) -> Agent {
        Agent::new(model, self.tools.clone(), PromptTemplate::new(self.prompts.clone()))
            .with_max_tool_rounds(self.settings.agent.max_tool_rounds)
            .with_tool_limit_policy(self.settings.agent.on_tool_limit)
    }

    /// A fresh chat history sized from settings.
    pub fn session(&self) -> ConversationSession {
        ConversationSession::new(self.settings.agent.history_turns)
    }

    /// Run one user turn and record it in `session`. Failed turns leave the
    /// history untouched.
    #[instrument(skip(self, agent, session))]
    pub async fn chat_turn(
        &self,
        agent: &Agent,
        session: &mut ConversationSession,
        input: &str,
    ) -> Result<AgentResponse> {
        let response = agent
            .run(input, session.turns())
            .await
            .map_err(TidingsError::from)?;
        session.record(input, &response.output);
        Ok(response)
    }
}
