use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

pub const NUM_FINGERS: usize = 6;

/// Logical joints of the hand, declared in wire order (the order of digits in a command line).
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Wrist,
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; NUM_FINGERS] = [
        Finger::Wrist,
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Every finger except the wrist carries a position/contact sensor.
    pub const SENSING: [Finger; NUM_FINGERS - 1] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn position(self) -> usize {
        match self {
            Finger::Wrist => 0,
            Finger::Thumb => 1,
            Finger::Index => 2,
            Finger::Middle => 3,
            Finger::Ring => 4,
            Finger::Pinky => 5,
        }
    }

    pub fn has_sensor(self) -> bool {
        !matches!(self, Finger::Wrist)
    }
}

impl Display for Finger {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Finger::Wrist => "wrist",
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        };
        f.write_str(name)
    }
}

/// Fixed-size map with exactly one slot per [`Finger`].
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct FingerMap<T>([T; NUM_FINGERS]);

impl<T> FingerMap<T> {
    pub fn from_fn(mut f: impl FnMut(Finger) -> T) -> Self {
        Self(Finger::ALL.map(|finger| f(finger)))
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(Finger) -> Result<T, E>) -> Result<Self, E> {
        let [wrist, thumb, index, middle, ring, pinky] = Finger::ALL;
        Ok(Self([f(wrist)?, f(thumb)?, f(index)?, f(middle)?, f(ring)?, f(pinky)?]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Finger, &T)> {
        Finger::ALL.into_iter().zip(self.0.iter())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> FingerMap<U> {
        FingerMap(self.0.map(f))
    }
}

impl<T> Index<Finger> for FingerMap<T> {
    type Output = T;

    fn index(&self, finger: Finger) -> &T {
        &self.0[finger.position()]
    }
}

impl<T> IndexMut<Finger> for FingerMap<T> {
    fn index_mut(&mut self, finger: Finger) -> &mut T {
        &mut self.0[finger.position()]
    }
}

/// Flexed (`true`) or extended (`false`) per finger.
pub type HandState = FingerMap<bool>;

impl HandState {
    pub fn all_extended() -> Self {
        Self::default()
    }

    pub fn fingers_differing_from<'a>(&'a self, other: &'a HandState) -> impl Iterator<Item = Finger> + 'a {
        Finger::ALL.into_iter().filter(move |f| self[*f] != other[*f])
    }

    /// Fingers flexed by this snapshot, for log lines.
    pub fn describe(&self) -> String {
        let flexed: Vec<String> = Finger::ALL
            .into_iter()
            .filter(|f| self[*f])
            .map(|f| f.to_string())
            .collect();
        if flexed.is_empty() {
            "all extended".to_owned()
        } else {
            format!("flexed: {}", flexed.join(", "))
        }
    }
}

/// Renders the same 6-digit form the command decoder accepts.
impl Display for FingerMap<bool> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (_, flexed) in self.iter() {
            f.write_str(if *flexed { "1" } else { "0" })?;
        }
        Ok(())
    }
}
