use crate::camera::CameraAction;
use crate::util::clock::Timestamp;
use resolver_core::{RelatedEventsPage, ResolverTree};
use std::fmt;

/// Identity of one resolver tree request. Allocated by the middleware,
/// strictly increasing within a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum ResolverAction {
    Camera(CameraAction),

    // ----- ui -----
    UserBroughtProcessIntoView {
        id: String,
        time: Timestamp,
    },
    UserFocusedOnResolverNode(String),
    UserSelectedResolverNode(String),
    UserSelectedRelatedEventCategory {
        entity_id: String,
        category: Option<String>,
    },
    AppReceivedNewExternalProperties {
        database_document_id: Option<String>,
        url_search: String,
        time: Timestamp,
    },
    AppDetectedNewIdFromQueryParams {
        id: String,
        time: Timestamp,
    },

    // ----- resolver tree -----
    AppRequestedResolverData {
        request_id: RequestId,
        database_document_id: String,
    },
    AppAbortedResolverDataRequest {
        request_id: RequestId,
    },
    ServerReturnedResolverData {
        request_id: RequestId,
        database_document_id: String,
        result: Box<ResolverTree>,
    },
    ServerFailedToReturnResolverData {
        request_id: RequestId,
        database_document_id: String,
    },

    // ----- related events -----
    UserRequestedRelatedEventData(String),
    UserRequestedAdditionalRelatedEvents(String),
    AppRequestedRelatedEventData {
        entity_id: String,
        generation: u64,
    },
    ServerReturnedRelatedEventData {
        entity_id: String,
        generation: u64,
        response: RelatedEventsPage,
    },
    ServerFailedToReturnRelatedEventData {
        entity_id: String,
        generation: u64,
    },
    AppAbortedRelatedEventDataRequest {
        entity_id: String,
        generation: u64,
    },
}

impl ResolverAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Camera(_) => "camera",
            Self::UserBroughtProcessIntoView { .. } => "userBroughtProcessIntoView",
            Self::UserFocusedOnResolverNode(_) => "userFocusedOnResolverNode",
            Self::UserSelectedResolverNode(_) => "userSelectedResolverNode",
            Self::UserSelectedRelatedEventCategory { .. } => "userSelectedRelatedEventCategory",
            Self::AppReceivedNewExternalProperties { .. } => "appReceivedNewExternalProperties",
            Self::AppDetectedNewIdFromQueryParams { .. } => "appDetectedNewIdFromQueryParams",
            Self::AppRequestedResolverData { .. } => "appRequestedResolverData",
            Self::AppAbortedResolverDataRequest { .. } => "appAbortedResolverDataRequest",
            Self::ServerReturnedResolverData { .. } => "serverReturnedResolverData",
            Self::ServerFailedToReturnResolverData { .. } => "serverFailedToReturnResolverData",
            Self::UserRequestedRelatedEventData(_) => "userRequestedRelatedEventData",
            Self::UserRequestedAdditionalRelatedEvents(_) => "userRequestedAdditionalRelatedEvents",
            Self::AppRequestedRelatedEventData { .. } => "appRequestedRelatedEventData",
            Self::ServerReturnedRelatedEventData { .. } => "serverReturnedRelatedEventData",
            Self::ServerFailedToReturnRelatedEventData { .. } => {
                "serverFailedToReturnRelatedEventData"
            }
            Self::AppAbortedRelatedEventDataRequest { .. } => "appAbortedRelatedEventDataRequest",
        }
    }
}

impl From<CameraAction> for ResolverAction {
    fn from(action: CameraAction) -> Self {
        Self::Camera(action)
    }
}
