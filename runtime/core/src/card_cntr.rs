// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

use {
    super::*,
    alsactl::{prelude::*, *},
    glib::FileError,
    tracing::{debug, debug_span},
};

/// The container of ALSA control card to operate the elements which drivers add.
#[derive(Default)]
pub struct CardCntr {
    pub card: Card,
}

impl CardCntr {
    /// Open the control character device for the sound card.
    pub fn open(&self, card_id: u32) -> Result<(), Error> {
        self.card.open(card_id, 0)
    }

    /// Find the element by its interface and name.
    pub fn find_elem_by_name(&self, iface: ElemIfaceType, name: &str) -> Result<ElemId, Error> {
        let _enter = debug_span!("find").entered();

        let elem_id_list = self.card.elem_id_list()?;
        elem_id_list
            .into_iter()
            .find(|elem_id| elem_id.iface() == iface && elem_id.name().as_str() == name)
            .map(|elem_id| {
                debug!(
                    numid = ?elem_id.numid(),
                    name = ?elem_id.name().as_str(),
                    iface = ?elem_id.iface(),
                    device_id = ?elem_id.device_id(),
                    subdevice_id = ?elem_id.subdevice_id(),
                    index = ?elem_id.index(),
                );
                elem_id
            })
            .ok_or_else(|| {
                let label = format!("Could not find {}", name);
                Error::new(FileError::Nodev, &label)
            })
    }

    /// Write the value to the first member of the boolean element.
    pub fn write_bool(&self, elem_id: &ElemId, val: bool) -> Result<(), Error> {
        let _enter = debug_span!("boolean").entered();

        let elem_info = self.card.elem_info(elem_id)?;
        let count = match elem_info {
            ElemInfo::Boolean(info) => info.value_count() as usize,
            _ => {
                let label = format!("{} is not supported", elem_id.name());
                Err(Error::new(FileError::Inval, &label))?
            }
        };

        let mut elem_value = ElemValue::new();
        self.card.read_elem_value(elem_id, &mut elem_value)?;

        let mut vals = elem_value.boolean()[..count].to_vec();
        if let Some(v) = vals.first_mut() {
            *v = val;
        }
        elem_value.set_bool(&vals);

        let res = self.card.write_elem_value(elem_id, &elem_value);
        debug!(numid = elem_id.numid(), values = ?vals, ?res);
        res
    }
}
