//! Fills the ArcGIS metadata template with the facts of one dataset.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::tree::Element;
use crate::config::Contact;
use crate::error::Result;
use crate::model::{BoundingBox, DatasetDescriptor, DatasetKind};

const ARCGIS_TEMPLATE: &str = r#"<?xml version="1.0"?>
<metadata xml:lang="en">
    <Esri>
        <CreaDate>{{creation_date}}</CreaDate>
        <CreaTime>{{creation_time}}</CreaTime>
        <ArcGISFormat>1.0</ArcGISFormat>
        <SyncOnce>TRUE</SyncOnce>
        <ArcGISProfile>FGDC</ArcGISProfile>
    </Esri>
    <mdFileID>{{file_id}}</mdFileID>
    <dataIdInfo>
        <idCitation xmlns="">
            <resTitle>{{title}}</resTitle>
            <date>
                <pubDate>{{publication_date}}</pubDate>
            </date>
            <citRespParty xmlns="">
                <rpIndName>{{contact_name}}</rpIndName>
                <rpOrgName>{{contact_organization}}</rpOrgName>
                <role>
                    <RoleCd value="006"/>
                </role>
            </citRespParty>
        </idCitation>
        <searchKeys/>
        <idPurp></idPurp>
        <idAbs>{{abstract}}</idAbs>
        <idCredit></idCredit>
        <resConst>
            <Consts>
                <useLimit></useLimit>
            </Consts>
        </resConst>
        <dataExt xmlns="">
            <geoEle xmlns="">
                <GeoBndBox esriExtentType="search">
                    <westBL>{{west}}</westBL>
                    <eastBL>{{east}}</eastBL>
                    <northBL>{{north}}</northBL>
                    <southBL>{{south}}</southBL>
                    <exTypeCode>1</exTypeCode>
                </GeoBndBox>
            </geoEle>
            <exDesc></exDesc>
            <tempEle>
                <TempExtent>
                    <exTemp>
                        <TM_Period xmlns="">
                            <tmBegin>{{timestamp}}</tmBegin>
                        </TM_Period>
                    </exTemp>
                </TempExtent>
            </tempEle>
        </dataExt>
        <dataChar>
            <CharSetCd value="004"/>
        </dataChar>
        <spatRpType>
            <SpatRepTypCd value=""/>
        </spatRpType>
        <idStatus>
            <ProgCd value=""/>
        </idStatus>
        <resMaint xmlns="">
            <maintFreq>
                <MaintFreqCd value=""/>
            </maintFreq>
        </resMaint>
        <tpCat>
            <TopicCatCd value=""/>
        </tpCat>
    </dataIdInfo>
    <mdHrLv>
        <ScopeCd value=""/>
    </mdHrLv>
    <mdDateSt Sync="TRUE">{{timestamp}}</mdDateSt>
    <mdContact xmlns="">
        <rpIndName>{{contact_name}}</rpIndName>
        <rpOrgName>{{contact_organization}}</rpOrgName>
        <role>
            <RoleCd value="006"/>
        </role>
        <displayName>{{contact_name}}</displayName>
        <rpCntInfo xmlns="">
            <cntAddress addressType="both">
                <city>{{city}}</city>
                <adminArea>{{admin_area}}</adminArea>
                <postCode>{{postal_code}}</postCode>
                <country>{{country}}</country>
            </cntAddress>
            <cntPhone>
                <voiceNum tddtty="">{{phone}}</voiceNum>
            </cntPhone>
        </rpCntInfo>
    </mdContact>
    <dqInfo xmlns="">
        <dataLineage>
            <statement></statement>
            <dataSource xmlns="" type="">
                <srcDesc></srcDesc>
                <srcMedName>
                    <MedNameCd value="015"/>
                </srcMedName>
                <srcCitatn xmlns="">
                    <resTitle>Network File Path</resTitle>
                    <citOnlineRes xmlns="">
                        <linkage>{{hierarchy}}</linkage>
                    </citOnlineRes>
                </srcCitatn>
            </dataSource>
        </dataLineage>
        <dqScope>
            <scpLvl>
                <ScopeCd value="005"/>
            </scpLvl>
        </dqScope>
    </dqInfo>
    <distInfo xmlns="">
        <distTranOps xmlns="">
            <onLineSrc xmlns="">
                <linkage>{{public_url}}</linkage>
                <orFunct>
                    <OnFunctCd value="001"/>
                </orFunct>
            </onLineSrc>
            <onLineSrc xmlns="">
                <linkage>{{file_url}}</linkage>
                <orFunct>
                    <OnFunctCd value="001"/>
                </orFunct>
            </onLineSrc>
        </distTranOps>
    </distInfo>
</metadata>"#;

/// Per-dataset facts that go into a metadata record.
#[derive(Debug, Clone)]
pub struct MetadataFacts<'a> {
    pub dataset: &'a DatasetDescriptor,
    pub bbox: BoundingBox,
    pub hierarchy: &'a str,
    /// URL of the published layer file.
    pub public_url: &'a str,
    /// `file://` URL of the dataset itself.
    pub file_url: &'a str,
    pub now: NaiveDateTime,
}

/// Title derived from a dataset name: `_`, `.` and `$` become spaces.
pub fn title_from_name(base_name: &str) -> String {
    base_name.replace(['_', '.', '$'], " ")
}

/// Generated abstract, with point cloud statistics appended.
pub fn describe(dataset: &DatasetDescriptor) -> String {
    let mut description = format!(
        "description {} is of type {}",
        dataset.base_name, dataset.kind
    );
    if let DatasetKind::PointCloud(las) = &dataset.kind {
        description.push_str(&format!(
            ". constraintCount = {}, fileCount = {}, hasStatistics = {}, needsUpdateStatistics = {}, pointCount = {}",
            las.constraint_count,
            las.file_count,
            las.has_statistics,
            las.needs_update_statistics,
            las.point_count
        ));
    }
    description
}

/// Builds the template document for one dataset.
pub fn synthesize(facts: &MetadataFacts<'_>, contact: &Contact) -> Result<Element> {
    let dataset = facts.dataset;
    let values: BTreeMap<&str, String> = [
        ("creation_date", facts.now.format("%Y%m%d").to_string()),
        ("creation_time", facts.now.format("%H%M%S").to_string()),
        ("publication_date", facts.now.format("%Y%m%d").to_string()),
        ("timestamp", facts.now.format("%Y-%m-%dT%H:%M:%S").to_string()),
        ("file_id", facts.file_url.to_string()),
        ("title", title_from_name(&dataset.base_name)),
        ("abstract", describe(dataset)),
        ("west", facts.bbox.west.to_string()),
        ("east", facts.bbox.east.to_string()),
        ("north", facts.bbox.north.to_string()),
        ("south", facts.bbox.south.to_string()),
        ("contact_name", contact.name.clone()),
        ("contact_organization", contact.organization.clone()),
        ("city", contact.city.clone()),
        ("admin_area", contact.admin_area.clone()),
        ("postal_code", contact.postal_code.clone()),
        ("country", contact.country.clone()),
        ("phone", contact.phone.clone()),
        ("hierarchy", facts.hierarchy.to_string()),
        ("public_url", facts.public_url.to_string()),
        ("file_url", facts.file_url.to_string()),
    ]
    .into_iter()
    .collect();

    let mut document = Element::parse(ARCGIS_TEMPLATE)?;
    document.walk_mut(&mut |el| {
        if let Some(text) = &el.text {
            if let Some(key) = text.strip_prefix("{{").and_then(|t| t.strip_suffix("}}")) {
                let value = values.get(key).cloned();
                el.set_text(value);
            }
        }
    });

    if let Some(keys) = document.find_mut(&["dataIdInfo", "searchKeys"]) {
        keys.children
            .push(Element::new("keyword").with_text(dataset.kind.data_type()));
        if !facts.hierarchy.is_empty() {
            keys.children
                .push(Element::new("keyword").with_text(facts.hierarchy));
        }
    }

    Ok(document)
}
