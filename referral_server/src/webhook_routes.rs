//----------------------------------------------   Webhooks  ----------------------------------------------------
//
// Both webhook scopes are wrapped in the signature middleware, so a handler only ever sees authentic calls. Once the
// signature has passed, the provider always gets a 200, otherwise it will keep redelivering the event.

use actix_web::{web, HttpRequest, HttpResponse};
use log::*;
use referral_engine::{mail_types::parse_mail_events, PaymentTransfer, ReferralFlowApi, ReferralGatewayDatabase};

use crate::{
    config::WebhookConfig,
    data_objects::{
        JsonResponse,
        MailWebhookResponse,
        MeetingEvent,
        UrlValidationPayload,
        UrlValidationResponse,
        URL_VALIDATION_EVENT,
    },
    route,
    signatures::url_validation_token,
};

route!(mail_webhook => Post "" impl ReferralGatewayDatabase, PaymentTransfer);
pub async fn mail_webhook<B, P>(req: HttpRequest, body: web::Bytes, api: web::Data<ReferralFlowApi<B, P>>) -> HttpResponse
where
    B: ReferralGatewayDatabase,
    P: PaymentTransfer,
{
    trace!("📧️ Received mail webhook request: {}", req.uri());
    let events = match parse_mail_events(body.as_ref()) {
        Ok(events) => events,
        Err(e) => {
            warn!("📧️ Could not parse mail webhook payload. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure(format!("Invalid mail event payload. {e}")));
        },
    };
    debug!("📧️ Processing {} mail event(s)", events.len());
    let outcomes = api.process_mail_events(events).await;
    HttpResponse::Ok().json(MailWebhookResponse { success: true, outcomes })
}

route!(meeting_webhook => Post "");
/// Meeting provider events. Session data does not affect referrals, so apart from answering the endpoint URL
/// validation challenge, events are logged and acknowledged.
pub async fn meeting_webhook(body: web::Bytes, config: web::Data<WebhookConfig>) -> HttpResponse {
    let event = match serde_json::from_slice::<MeetingEvent>(body.as_ref()) {
        Ok(ev) => ev,
        Err(e) => {
            warn!("📧️ Could not parse meeting webhook payload. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure(format!("Invalid meeting event payload. {e}")));
        },
    };
    if event.event != URL_VALIDATION_EVENT {
        info!("📧️ Meeting event '{}' received and acknowledged", event.event);
        return HttpResponse::Ok().json(JsonResponse::success("Event acknowledged."));
    }
    let payload = match serde_json::from_value::<UrlValidationPayload>(event.payload) {
        Ok(p) => p,
        Err(e) => {
            warn!("📧️ URL validation challenge is missing its token. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("URL validation challenge is missing plainToken."));
        },
    };
    match url_validation_token(config.meeting_secret.reveal(), &payload.plain_token) {
        Ok(encrypted_token) => {
            info!("📧️ Answering meeting provider URL validation challenge");
            HttpResponse::Ok().json(UrlValidationResponse { plain_token: payload.plain_token, encrypted_token })
        },
        Err(e) => {
            error!("📧️ Cannot answer URL validation challenge. {e}");
            HttpResponse::Ok().json(JsonResponse::failure(e))
        },
    }
}
