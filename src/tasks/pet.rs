// SipSense - Pet Task
//
// Stand-in for the display layer. Consumes events from the sensor task,
// keeps the mascot's mood and running counters, and logs each reaction.

use std::sync::mpsc::Receiver;

use crate::events::PetEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mood {
    #[default]
    Content,
    /// Bottle is tipped; mascot watches expectantly.
    Drinking,
    /// A sip just landed.
    Happy,
    /// Bottle was shaken.
    Dizzy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetState {
    pub mood: Mood,
    pub sips: u32,
    pub water_ml: f32,
    pub shakes: u32,
    pub sensor_hiccups: u32,
}

impl PetState {
    /// Fold one event into the state. Returns the new mood if it changed.
    pub fn apply(&mut self, event: PetEvent) -> Option<Mood> {
        let before = self.mood;

        match event {
            PetEvent::DrinkingStarted => {
                if self.mood != Mood::Dizzy {
                    self.mood = Mood::Drinking;
                }
            }
            PetEvent::SipCompleted(sip) => {
                self.sips += 1;
                self.water_ml += sip.volume_ml;
                self.mood = Mood::Happy;
            }
            PetEvent::DrinkingStopped => {
                if self.mood == Mood::Drinking {
                    self.mood = Mood::Content;
                }
            }
            PetEvent::ShakeStarted => {
                self.shakes += 1;
                self.mood = Mood::Dizzy;
            }
            PetEvent::ShakeEnded => {
                if self.mood == Mood::Dizzy {
                    self.mood = Mood::Content;
                }
            }
            PetEvent::Totals { lifetime_ml, sips } => {
                self.water_ml = lifetime_ml;
                self.sips = sips;
            }
            PetEvent::SensorHiccup => self.sensor_hiccups += 1,
            PetEvent::Recalibrated { .. } => self.mood = Mood::Content,
        }

        (self.mood != before).then_some(self.mood)
    }
}

pub fn pet_task(pet_rx: Receiver<PetEvent>) -> PetState {
    log::info!("Pet task started");

    let mut pet = PetState::default();

    // Block until the sensor task hangs up.
    while let Ok(event) = pet_rx.recv() {
        match event {
            PetEvent::SipCompleted(sip) => log::info!(
                "Sip! {:.0} ml in {:.1} s ({} sips, {:.0} ml total)",
                sip.volume_ml,
                sip.duration.as_secs_f32(),
                pet.sips + 1,
                pet.water_ml + sip.volume_ml
            ),
            PetEvent::Totals { lifetime_ml, sips } => {
                log::info!("Totals: {} sips, {:.1} ml", sips, lifetime_ml)
            }
            PetEvent::Recalibrated { noise_threshold_deg } => {
                log::info!("Recalibrated (noise threshold {:.1}°)", noise_threshold_deg)
            }
            PetEvent::SensorHiccup => log::debug!("Sensor skipped a tick"),
            _ => {}
        }

        if let Some(mood) = pet.apply(event) {
            log::info!("Mascot mood: {:?}", mood);
        }
    }

    log::info!("Pet task exiting ({} sips, {:.1} ml)", pet.sips, pet.water_ml);
    pet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Sip;
    use std::sync::mpsc;
    use std::time::Duration;

    fn sip(ml: f32) -> PetEvent {
        PetEvent::SipCompleted(Sip {
            duration: Duration::from_millis(900),
            volume_ml: ml,
        })
    }

    #[test]
    fn sips_accumulate_and_cheer() {
        let mut pet = PetState::default();
        assert_eq!(pet.apply(PetEvent::DrinkingStarted), Some(Mood::Drinking));
        assert_eq!(pet.apply(sip(8.0)), Some(Mood::Happy));
        pet.apply(sip(4.5));
        assert_eq!(pet.sips, 2);
        assert!((pet.water_ml - 12.5).abs() < 1e-6);
    }

    #[test]
    fn shake_makes_dizzy_until_it_ends() {
        let mut pet = PetState::default();
        assert_eq!(pet.apply(PetEvent::ShakeStarted), Some(Mood::Dizzy));
        assert_eq!(pet.apply(PetEvent::DrinkingStarted), None);
        assert_eq!(pet.apply(PetEvent::ShakeEnded), Some(Mood::Content));
        assert_eq!(pet.shakes, 1);
    }

    #[test]
    fn totals_overwrite_counters() {
        let mut pet = PetState::default();
        pet.apply(sip(10.0));
        pet.apply(PetEvent::Totals {
            lifetime_ml: 0.0,
            sips: 0,
        });
        assert_eq!(pet.sips, 0);
        assert_eq!(pet.water_ml, 0.0);
    }

    #[test]
    fn task_drains_until_sender_drops() {
        let (tx, rx) = mpsc::channel();
        tx.send(PetEvent::DrinkingStarted).unwrap();
        tx.send(sip(6.0)).unwrap();
        tx.send(PetEvent::SensorHiccup).unwrap();
        drop(tx);

        let pet = pet_task(rx);
        assert_eq!(pet.sips, 1);
        assert_eq!(pet.sensor_hiccups, 1);
        assert_eq!(pet.mood, Mood::Happy);
    }
}
