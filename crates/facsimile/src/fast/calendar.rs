use facsimile_heap::{Body, ObjRef};

use super::{DeepCloner, FastCloner};
use crate::error::{CloneError, CloneResult};

/// `GregorianCalendar`: a new calendar with the same zone, instant, week
/// start and leniency
pub struct CalendarCloner;

impl FastCloner for CalendarCloner {
    fn fast_clone(&self, original: &ObjRef, _cloner: &mut dyn DeepCloner) -> CloneResult<ObjRef> {
        let calendar = match &*original.body() {
            Body::Calendar(calendar) => calendar.clone(),
            _ => return Err(CloneError::unexpected_body(original, "calendar")),
        };
        Ok(ObjRef::new(original.class().clone(), Body::Calendar(calendar)))
    }
}
