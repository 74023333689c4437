//! Fields and rules shared by every built-in channel type.
//!
//! ## Common terms
//!
//! | Term      | Kind            | Rule                                         |
//! |-----------|-----------------|----------------------------------------------|
//! | `topic`   | IRI             | required, absolute                           |
//! | `state`   | string          | optional                                     |
//! | `startAt` | `xsd:dateTime`  | optional, RFC 3339                           |
//! | `endAt`   | `xsd:dateTime`  | optional, after `startAt`, in the future, capped |
//! | `rate`    | `xsd:duration`  | optional, `PnDTnHnMnS`                       |
//! | `accept`  | string          | optional, `type/subtype`                     |
//!
//! Every term is single-valued. Statements the type does not understand are
//! rejected rather than ignored.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{json, Map, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::error::{ChannelMismatch, ValidationError};
use crate::types::vocab::{
    compact_iri, feature, notify, NOTIFY, NOTIFY_CONTEXT, RDF_TYPE, XSD_DATE_TIME, XSD_DURATION,
    XSD_STRING,
};
use crate::types::{
    format_duration, parse_duration, AccessMap, AccessMode, ChannelId, Graph, NotificationChannel,
    SubscriptionService, Term,
};

use super::typed_subject;

/// Terms every built-in channel type understands.
pub const COMMON_TERMS: &[&str] = &["topic", "state", "startAt", "endAt", "rate", "accept"];

/// Parsed common fields of a subscription payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonFields {
    /// Subject describing the channel.
    pub subject: Term,
    /// Watched resource.
    pub topic: String,
    /// Client-known state.
    pub state: Option<String>,
    /// Start time.
    pub start_at: Option<DateTime<Utc>>,
    /// Expiry, after capping.
    pub end_at: Option<DateTime<Utc>>,
    /// Minimum notification interval.
    pub rate: Option<Duration>,
    /// Requested media type.
    pub accept: Option<String>,
}

/// Shared behaviour of the built-in channel types.
///
/// Channel types embed one of these and delegate the common parts of each
/// lifecycle step to it.
#[derive(Debug, Clone)]
pub struct BaseChannelType {
    channel_type: String,
    service: SubscriptionService,
    max_duration: Option<Duration>,
}

impl BaseChannelType {
    /// Create the shared part of a channel type identified by `channel_type`.
    pub fn new(channel_type: impl Into<String>, config: &NotificationConfig) -> Self {
        let channel_type = channel_type.into();
        let service = SubscriptionService::new(
            config.subscription_endpoint(&channel_type),
            compact_iri(&channel_type),
            feature::DEFAULT_FEATURES.iter().copied(),
        );
        Self {
            channel_type,
            service,
            max_duration: config.max_duration(),
        }
    }

    /// Channel-type IRI.
    pub fn channel_type(&self) -> &str {
        &self.channel_type
    }

    /// Discovery description.
    pub fn service(&self) -> &SubscriptionService {
        &self.service
    }

    /// Fresh channel id under the subscription endpoint, plus its random part.
    pub fn generate_id(&self) -> (ChannelId, Uuid) {
        let uuid = Uuid::new_v4();
        (ChannelId::new(format!("{}{}", self.service.id, uuid)), uuid)
    }

    /// Parse and validate the common fields.
    ///
    /// `extra_terms` are the type-specific terms the caller will read itself;
    /// any other term is rejected.
    pub fn parse_common(
        &self,
        data: &Graph,
        extra_terms: &[&str],
    ) -> Result<CommonFields, ValidationError> {
        let subject = typed_subject(data)?;
        self.check_statements(data, subject, extra_terms)?;

        let topic = required_iri(data, subject, "topic")?;
        let state = optional_literal(data, subject, "state", XSD_STRING)?;
        let start_at = optional_datetime(data, subject, "startAt")?;
        let mut end_at = optional_datetime(data, subject, "endAt")?;

        if let (Some(start), Some(end)) = (start_at, end_at) {
            if end <= start {
                return Err(ValidationError::field("endAt", "must be later than startAt"));
            }
        }

        let now = Utc::now();
        if let Some(end) = end_at {
            if end <= now {
                return Err(ValidationError::field("endAt", "must be in the future"));
            }
        }
        if let Some(cap) = self.expiry_cap(now) {
            if end_at.map_or(true, |end| end > cap) {
                end_at = Some(cap);
            }
        }
        if let (Some(start), Some(end)) = (start_at, end_at) {
            if start >= end {
                return Err(ValidationError::field(
                    "startAt",
                    "must be earlier than the channel expiry",
                ));
            }
        }

        let rate = optional_literal(data, subject, "rate", XSD_DURATION)?
            .map(|raw| parse_duration(&raw).map_err(|e| ValidationError::duration("rate", e)))
            .transpose()?;

        let accept = optional_literal(data, subject, "accept", XSD_STRING)?;
        if let Some(media_type) = &accept {
            if !is_media_type(media_type) {
                return Err(ValidationError::field("accept", "expected a media type"));
            }
        }

        Ok(CommonFields {
            subject: subject.clone(),
            topic,
            state,
            start_at,
            end_at,
            rate,
            accept,
        })
    }

    /// Refuse channels produced by another type.
    pub fn ensure_owned(&self, channel: &NotificationChannel) -> Result<(), ChannelMismatch> {
        if channel.channel_type == self.channel_type {
            Ok(())
        } else {
            Err(ChannelMismatch {
                expected: self.channel_type.clone(),
                found: channel.channel_type.clone(),
            })
        }
    }

    /// JSON-LD document with the common fields filled in.
    pub fn serialize_common(&self, channel: &NotificationChannel) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("@context".into(), json!([NOTIFY_CONTEXT]));
        doc.insert("id".into(), json!(channel.id.as_str()));
        doc.insert("type".into(), json!(compact_iri(&channel.channel_type)));
        doc.insert("topic".into(), json!(channel.topic));
        if let Some(state) = &channel.state {
            doc.insert("state".into(), json!(state));
        }
        if let Some(start_at) = &channel.start_at {
            doc.insert("startAt".into(), json!(format_datetime(start_at)));
        }
        if let Some(end_at) = &channel.end_at {
            doc.insert("endAt".into(), json!(format_datetime(end_at)));
        }
        if let Some(rate) = channel.rate {
            doc.insert("rate".into(), json!(format_duration(rate)));
        }
        if let Some(accept) = &channel.accept {
            doc.insert("accept".into(), json!(accept));
        }
        doc
    }

    /// Read access on the topic, nothing else.
    pub fn extract_modes(&self, channel: &NotificationChannel) -> AccessMap {
        AccessMap::single(channel.topic.clone(), [AccessMode::Read])
    }

    fn expiry_cap(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let max = chrono::Duration::from_std(self.max_duration?).ok()?;
        now.checked_add_signed(max).map(|cap| cap.trunc_subsecs(0))
    }

    fn check_statements(
        &self,
        data: &Graph,
        subject: &Term,
        extra_terms: &[&str],
    ) -> Result<(), ValidationError> {
        if let Some(stray) = data.iter().find(|q| &q.subject != subject) {
            return Err(ValidationError::payload(format!(
                "unexpected statement about {}",
                stray.subject
            )));
        }

        let types: Vec<&Term> = data.objects(subject, RDF_TYPE);
        if !types.iter().any(|t| t.as_iri() == Some(self.channel_type.as_str())) {
            return Err(ValidationError::field(
                "type",
                format!("expected {}", compact_iri(&self.channel_type)),
            ));
        }

        for predicate in data.predicates_of(subject) {
            if predicate == RDF_TYPE {
                continue;
            }
            let local = compact_iri(predicate);
            let known = predicate.starts_with(NOTIFY)
                && (COMMON_TERMS.contains(&local) || extra_terms.contains(&local));
            if !known {
                return Err(ValidationError::unsupported(local));
            }
        }
        Ok(())
    }
}

fn single<'a>(
    data: &'a Graph,
    subject: &'a Term,
    predicate: &'a str,
    field: &str,
) -> Result<Option<&'a Term>, ValidationError> {
    match data.objects(subject, predicate).as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(*one)),
        _ => Err(ValidationError::field(field, "expected a single value")),
    }
}

/// Required absolute IRI value of `field`.
pub fn required_iri(data: &Graph, subject: &Term, field: &str) -> Result<String, ValidationError> {
    optional_iri(data, subject, field)?.ok_or_else(|| ValidationError::missing(field))
}

/// Optional absolute IRI value of `field`.
pub fn optional_iri(
    data: &Graph,
    subject: &Term,
    field: &str,
) -> Result<Option<String>, ValidationError> {
    let predicate = notify(field);
    let Some(term) = single(data, subject, &predicate, field)? else {
        return Ok(None);
    };
    let iri = term.as_iri().ok_or_else(|| {
        ValidationError::field(field, format!("expected an IRI, got a {}", term.kind_name()))
    })?;
    url::Url::parse(iri)
        .map_err(|e| ValidationError::field(field, format!("not an absolute IRI: {e}")))?;
    Ok(Some(iri.to_string()))
}

/// Optional literal value of `field` with the given datatype.
///
/// Plain strings are accepted for any datatype, since compact JSON-LD
/// without a context carries no datatype.
pub fn optional_literal(
    data: &Graph,
    subject: &Term,
    field: &str,
    datatype: &str,
) -> Result<Option<String>, ValidationError> {
    let predicate = notify(field);
    let Some(term) = single(data, subject, &predicate, field)? else {
        return Ok(None);
    };
    match term.as_literal() {
        Some((value, dt)) if dt == datatype || dt == XSD_STRING => Ok(Some(value.to_string())),
        Some((_, dt)) => Err(ValidationError::field(
            field,
            format!("unexpected datatype <{dt}>"),
        )),
        None => Err(ValidationError::field(
            field,
            format!("expected a literal, got a {}", term.kind_name()),
        )),
    }
}

fn optional_datetime(
    data: &Graph,
    subject: &Term,
    field: &str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    optional_literal(data, subject, field, XSD_DATE_TIME)?
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ValidationError::field(field, format!("invalid dateTime: {e}")))
        })
        .transpose()
}

fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn is_media_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim();
    match essence.split_once('/') {
        Some((kind, subtype)) => {
            let token = |s: &str| {
                !s.is_empty()
                    && s.bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+*".contains(&b))
            };
            token(kind) && token(subtype)
        }
        None => false,
    }
}
