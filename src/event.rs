// src/event.rs — событие трассы и его сериализация.
//
// Payload события (LE, 28 байт, без паддинга):
// u16 common_type         (= id события)
// u8  common_flags        (0)
// u8  common_preempt_count(0)
// i32 common_pid          (0, зарезервировано)
// u32 cpu                 (virtual CPU)
// u32 pcpu                (physical CPU)
// u32 id                  (3 = HV_Resume, 4 = HV_Exit)
// u64 ts

use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::consts::{EVENT_ID_EXIT, EVENT_ID_RESUME, EVENT_NAME_EXIT, EVENT_NAME_RESUME};

/// Closed set of event schemas the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Resume,
    Exit,
}

impl EventKind {
    /// Map an event-name column to its kind. Unknown names are the caller's
    /// fatal error (the event id cannot be determined otherwise).
    pub fn from_name(name: &str) -> Option<EventKind> {
        match name {
            EVENT_NAME_RESUME => Some(EventKind::Resume),
            EVENT_NAME_EXIT => Some(EventKind::Exit),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            EventKind::Resume => EVENT_ID_RESUME,
            EventKind::Exit => EVENT_ID_EXIT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Resume => EVENT_NAME_RESUME,
            EventKind::Exit => EVENT_NAME_EXIT,
        }
    }
}

/// One parsed trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub common_type: u16,
    pub common_flags: u8,
    pub common_preempt_count: u8,
    pub common_pid: i32,
    pub cpu: u32,
    pub pcpu: u32,
    pub id: u32,
    pub ts: u64,
}

impl Event {
    pub fn new(kind: EventKind, cpu: u32, pcpu: u32, ts: u64) -> Self {
        Self {
            common_type: kind.id() as u16,
            common_flags: 0,
            common_preempt_count: 0,
            common_pid: 0,
            cpu,
            pcpu,
            id: kind.id(),
            ts,
        }
    }

    /// Serialize the 28-byte payload (field by field, LE).
    pub fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u16::<LittleEndian>(self.common_type)?;
        w.write_u8(self.common_flags)?;
        w.write_u8(self.common_preempt_count)?;
        w.write_i32::<LittleEndian>(self.common_pid)?;
        w.write_u32::<LittleEndian>(self.cpu)?;
        w.write_u32::<LittleEndian>(self.pcpu)?;
        w.write_u32::<LittleEndian>(self.id)?;
        w.write_u64::<LittleEndian>(self.ts)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::EVENT_PAYLOAD_SIZE;

    #[test]
    fn kind_mapping() {
        assert_eq!(EventKind::from_name("HV_Resume"), Some(EventKind::Resume));
        assert_eq!(EventKind::from_name("HV_Exit"), Some(EventKind::Exit));
        assert_eq!(EventKind::from_name("HV_Halt"), None);
        assert_eq!(EventKind::Resume.id(), 3);
        assert_eq!(EventKind::Exit.id(), 4);
    }

    #[test]
    fn payload_bytes_exact() {
        let ev = Event::new(EventKind::Exit, 2, 7, 0x0102_0304_0506_0708);
        let mut buf = Vec::new();
        ev.write_payload(&mut buf).unwrap();
        assert_eq!(buf.len(), EVENT_PAYLOAD_SIZE);

        // common_type = 4 (LE), flags/preempt/pid нулевые
        assert_eq!(&buf[0..2], &[4, 0]);
        assert_eq!(&buf[2..4], &[0, 0]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 0]);
        // cpu, pcpu, id
        assert_eq!(&buf[8..12], &[2, 0, 0, 0]);
        assert_eq!(&buf[12..16], &[7, 0, 0, 0]);
        assert_eq!(&buf[16..20], &[4, 0, 0, 0]);
        // ts LE
        assert_eq!(&buf[20..28], &[8, 7, 6, 5, 4, 3, 2, 1]);
    }
}
