//! Endpoint façade
//!
//! Each remote operation is one row of the table below: a subject, a
//! request type and a reply type. The table expands into a marker type
//! implementing [`Endpoint`] and a method on [`NcClient`] that forwards to
//! the secure RPC envelope. Request/reply pairing is checked at compile time.
//!
//! Methods carry no business logic. Chaining calls (for example taking the
//! first team id from `list_teams` to feed `get_team`) is up to the caller.

pub mod stripe;
pub mod synadia;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::session::NcClient;
use crate::types::Result;

/// Compile-time binding of a subject to its request and reply types
pub trait Endpoint {
    /// Bus subject the backend listens on
    const SUBJECT: &'static str;
    type Request: Serialize + Send + Sync;
    type Reply: DeserializeOwned + Send;
}

macro_rules! endpoints {
    ($(
        $(#[$doc:meta])*
        $method:ident => $marker:ident, $subject:literal, $request:ty => $reply:ty;
    )*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $marker;

            impl Endpoint for $marker {
                const SUBJECT: &'static str = $subject;
                type Request = $request;
                type Reply = $reply;
            }
        )*

        /// Every subject served through the façade, in table order
        pub const SUBJECTS: &[&str] = &[$($subject),*];

        impl NcClient {
            $(
                $(#[$doc])*
                pub async fn $method(&self, request: &$request) -> Result<$reply> {
                    self.call::<$marker>(request).await
                }
            )*
        }
    };
}

endpoints! {
    /// List the teams visible to the Synadia Cloud token
    list_teams => ListTeams, "SYNADIA.LIST_TEAMS",
        synadia::ListTeamsRequest => synadia::ListTeamsReply;
    /// Fetch one team
    get_team => GetTeam, "SYNADIA.GET_TEAM",
        synadia::GetTeamRequest => synadia::GetTeamReply;
    /// Fetch the limits of one team
    get_team_limits => GetTeamLimits, "SYNADIA.GET_TEAM_LIMITS",
        synadia::GetTeamLimitsRequest => synadia::GetTeamLimitsReply;
    /// List the app users of one team
    list_info_app_users_team => ListInfoAppUsersTeam, "SYNADIA.LIST_INFO_APP_USERS_TEAM",
        synadia::ListInfoAppUsersTeamRequest => synadia::ListInfoAppUsersTeamReply;
    /// List the personal access tokens of one team
    list_personal_access_tokens => ListPersonalAccessTokens, "SYNADIA.LIST_PERSONAL_ACCESS_TOKENS",
        synadia::ListPersonalAccessTokensRequest => synadia::ListPersonalAccessTokensReply;
    /// Fetch one personal access token
    get_personal_access_token => GetPersonalAccessToken, "SYNADIA.GET_PERSONAL_ACCESS_TOKEN",
        synadia::GetPersonalAccessTokenRequest => synadia::GetPersonalAccessTokenReply;
    /// List the server accounts of one team
    list_team_server_accounts => ListTeamServerAccounts, "SYNADIA.LIST_TEAM_SERVER_ACCOUNTS",
        synadia::ListTeamServerAccountsRequest => synadia::ListTeamServerAccountsReply;
    /// List the systems of one team
    list_systems => ListSystems, "SYNADIA.LIST_SYSTEMS",
        synadia::ListSystemsRequest => synadia::ListSystemsReply;
    /// Fetch one system
    get_system => GetSystem, "SYNADIA.GET_SYSTEM",
        synadia::GetSystemRequest => synadia::GetSystemReply;
    /// Fetch the limits of one system
    get_system_limits => GetSystemLimits, "SYNADIA.GET_SYSTEM_LIMITS",
        synadia::GetSystemLimitsRequest => synadia::GetSystemLimitsReply;
    /// List account information for one system
    list_system_account_info => ListSystemAccountInfo, "SYNADIA.LIST_SYSTEM_ACCOUNT_INFO",
        synadia::ListSystemAccountInfoRequest => synadia::ListSystemAccountInfoReply;
    /// List server information for one system
    list_system_server_info => ListSystemServerInfo, "SYNADIA.LIST_SYSTEM_SERVER_INFO",
        synadia::ListSystemServerInfoRequest => synadia::ListSystemServerInfoReply;
    /// List the accounts of one system
    list_accounts => ListAccounts, "SYNADIA.LIST_ACCOUNTS",
        synadia::ListAccountsRequest => synadia::ListAccountsReply;
    /// List the NATS users of one account
    list_nats_users => ListNatsUsers, "SYNADIA.LIST_NATS_USERS",
        synadia::ListNatsUsersRequest => synadia::ListNatsUsersReply;
    /// Synadia Cloud version
    get_version => GetVersion, "SYNADIA.GET_VERSION",
        synadia::GetVersionRequest => synadia::GetVersionReply;

    /// Create a Stripe payment intent
    create_payment_intent => CreatePaymentIntent, "STRIPE.CREATE_PAYMENT_INTENT",
        stripe::CreatePaymentIntentRequest => stripe::PaymentIntent;
    /// Confirm a Stripe payment intent
    confirm_payment_intent => ConfirmPaymentIntent, "STRIPE.CONFIRM_PAYMENT_INTENT",
        stripe::ConfirmPaymentIntentRequest => stripe::PaymentIntent;
    /// Capture the funds of an authorized payment intent
    capture_payment_intent => CapturePaymentIntent, "STRIPE.CAPTURE_PAYMENT_INTENT",
        stripe::CapturePaymentIntentRequest => stripe::PaymentIntent;
    /// Cancel a Stripe payment intent
    cancel_payment_intent => CancelPaymentIntent, "STRIPE.CANCEL_PAYMENT_INTENT",
        stripe::CancelPaymentIntentRequest => stripe::PaymentIntent;
    /// List Stripe payment intents
    list_payment_intents => ListPaymentIntents, "STRIPE.LIST_PAYMENT_INTENTS",
        stripe::ListPaymentIntentsRequest => stripe::PaymentIntentList;
}
